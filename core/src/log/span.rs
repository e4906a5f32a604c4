use chrono::TimeDelta;
use thiserror::Error;

use super::EncounterLog;
use crate::combat_log::{Event, SequenceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("spans {0:?} and {1:?} do not overlap")]
pub struct DisjointSpans(pub EventSpan, pub EventSpan);

/// Inclusive range `[start, end]` of sequence ids within one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventSpan {
    start: SequenceId,
    end: SequenceId,
}

impl EventSpan {
    /// Span covering both endpoints, in whichever order they are given.
    pub fn new(a: SequenceId, b: SequenceId) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(sequence_id: SequenceId) -> Self {
        Self::new(sequence_id, sequence_id)
    }

    pub fn start(&self) -> SequenceId {
        self.start
    }

    pub fn end(&self) -> SequenceId {
        self.end
    }

    /// Number of events in the span.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, sequence_id: SequenceId) -> bool {
        (self.start..=self.end).contains(&sequence_id)
    }

    pub fn contains_span(&self, other: &EventSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &EventSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Union of two overlapping spans.
    pub fn merge(&self, other: &EventSpan) -> Result<EventSpan, DisjointSpans> {
        if !self.overlaps(other) {
            return Err(DisjointSpans(*self, *other));
        }
        Ok(EventSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }

    pub fn sequence_ids(&self) -> std::ops::RangeInclusive<SequenceId> {
        self.start..=self.end
    }

    /// Events of the span, front to back. Reverse with `.rev()`.
    pub fn iter<'a>(&self, log: &'a EncounterLog) -> std::slice::Iter<'a, Event> {
        log.events_in(*self).iter()
    }

    /// Time between the first and last event, when both are timed.
    pub fn duration(&self, log: &EncounterLog) -> Option<TimeDelta> {
        let start = log.get(self.start)?.time()?;
        let end = log.get(self.end)?.time()?;
        Some(end - start)
    }
}
