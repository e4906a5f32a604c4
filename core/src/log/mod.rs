//! Encounter log: the arena of one recording session.
//!
//! A log owns its ordered events, the derived metadata indices, and the
//! singleton `BEGIN_LOG`/`END_LOG` positions. Construction validates the
//! singletons and dense sequence ids, then assigns every event its time.

mod span;
mod timing;

#[cfg(test)]
mod log_tests;

use chrono::NaiveDateTime;
use hashbrown::HashMap;
use thiserror::Error;

use crate::combat_log::{
    AbilityInfo, BeginLog, CastStatus, EffectInfo, Event, EventKind, EventType, SequenceId,
    UnitAdded,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::resolve::{ResolutionReport, ResolveError};

pub use span::{DisjointSpans, EventSpan};
pub use timing::assign_times;

/// Fatal problems constructing a log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("log has no events")]
    EmptyLog,
    #[error("log has no BEGIN_LOG event")]
    MissingBeginLog,
    #[error("log has more than one BEGIN_LOG event (at {first} and {second})")]
    DuplicateBeginLog { first: SequenceId, second: SequenceId },
    #[error("log has no END_LOG event")]
    MissingEndLog,
    #[error("log has more than one END_LOG event (at {first} and {second})")]
    DuplicateEndLog { first: SequenceId, second: SequenceId },
    #[error("event at index {index} has sequence id {sequence_id}")]
    SequenceMismatch {
        index: usize,
        sequence_id: SequenceId,
    },
    #[error("BEGIN_LOG at {0} has no time")]
    BeginLogWithoutTime(SequenceId),
}

/// Metadata lookups derived from a log's events.
#[derive(Debug, Clone, Default)]
pub struct LogIndex {
    /// Ability id to `ABILITY_INFO` event.
    pub ability_infos: HashMap<i64, SequenceId>,
    /// Ability id to `EFFECT_INFO` event.
    pub effect_infos: HashMap<i64, SequenceId>,
    /// Unit id to the latest player `UNIT_ADDED` event.
    pub player_units: HashMap<i64, SequenceId>,
}

impl LogIndex {
    fn build(events: &[Event], diagnostics: &mut Diagnostics) -> Self {
        let mut index = Self::default();
        for event in events {
            let seq = event.sequence_id;
            match &event.kind {
                EventKind::AbilityInfo(info) => {
                    if let Some(previous) = index.ability_infos.insert(info.ability_id, seq) {
                        diagnostics.debug(
                            DiagnosticKind::DuplicateInfo,
                            Some(seq),
                            format!(
                                "ability {} described again (previously at {previous})",
                                info.ability_id
                            ),
                        );
                    }
                }
                EventKind::EffectInfo(info) => {
                    if let Some(previous) = index.effect_infos.insert(info.ability_id, seq) {
                        diagnostics.debug(
                            DiagnosticKind::DuplicateInfo,
                            Some(seq),
                            format!(
                                "effect {} described again (previously at {previous})",
                                info.ability_id
                            ),
                        );
                    }
                }
                EventKind::UnitAdded(unit) if unit.is_player() => {
                    index.player_units.insert(unit.unit_id, seq);
                }
                _ => {}
            }
        }
        index
    }
}

#[derive(Debug, Clone)]
pub struct EncounterLog {
    events: Vec<Event>,
    begin_log: SequenceId,
    end_log: SequenceId,
    index: LogIndex,
    resolved: bool,
}

impl EncounterLog {
    /// Validate and time a materialized event list.
    pub fn from_events(
        mut events: Vec<Event>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, LogError> {
        if events.is_empty() {
            return Err(LogError::EmptyLog);
        }
        if let Some((index, event)) = events
            .iter()
            .enumerate()
            .find(|(index, event)| event.sequence_id != *index)
        {
            return Err(LogError::SequenceMismatch {
                index,
                sequence_id: event.sequence_id,
            });
        }

        let begin_log = find_singleton(&events, EventType::BeginLog)?
            .ok_or(LogError::MissingBeginLog)?;
        let end_log = find_singleton(&events, EventType::EndLog)?.ok_or(LogError::MissingEndLog)?;

        for event in &events {
            if let EventKind::ErrorStub(stub) = &event.kind {
                diagnostics.warn(
                    DiagnosticKind::RowConversion,
                    Some(event.sequence_id),
                    stub.error.to_string(),
                );
            }
        }

        assign_times(&mut events, begin_log, diagnostics)?;
        let index = LogIndex::build(&events, diagnostics);

        Ok(Self {
            events,
            begin_log,
            end_log,
            index,
            resolved: false,
        })
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, sequence_id: SequenceId) -> Option<&Event> {
        self.events.get(sequence_id)
    }

    pub fn previous(&self, sequence_id: SequenceId) -> Option<&Event> {
        sequence_id.checked_sub(1).and_then(|seq| self.get(seq))
    }

    pub fn next(&self, sequence_id: SequenceId) -> Option<&Event> {
        self.get(sequence_id + 1)
    }

    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.event_type() == event_type)
    }

    pub fn error_stub_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_error_stub()).count()
    }

    // ─── Boundaries ─────────────────────────────────────────────────────────

    pub fn begin_log_event(&self) -> &Event {
        &self.events[self.begin_log]
    }

    pub fn begin_log(&self) -> Option<&BeginLog> {
        self.begin_log_event().as_begin_log()
    }

    pub fn end_log_event(&self) -> &Event {
        &self.events[self.end_log]
    }

    pub fn begin_time(&self) -> Option<NaiveDateTime> {
        self.begin_log_event().time()
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.end_log_event().time()
    }

    // ─── Spans ──────────────────────────────────────────────────────────────

    /// Span between two sequence ids of this log.
    pub fn span(&self, a: SequenceId, b: SequenceId) -> Option<EventSpan> {
        (a < self.len() && b < self.len()).then(|| EventSpan::new(a, b))
    }

    /// Span from a begin-type event to its resolved end, or just the event.
    pub fn span_to_end(&self, sequence_id: SequenceId) -> Option<EventSpan> {
        let event = self.get(sequence_id)?;
        let end = match &event.kind {
            EventKind::BeginLog(_) => Some(self.end_log),
            EventKind::BeginCombat(begin) => begin.end_combat,
            EventKind::BeginTrial(begin) => begin.end_trial,
            EventKind::BeginCast(begin) => begin.end_cast,
            EventKind::UnitAdded(unit) => unit.unit_removed,
            _ => None,
        };
        Some(EventSpan::new(sequence_id, end.unwrap_or(sequence_id)))
    }

    /// The whole log.
    pub fn full_span(&self) -> EventSpan {
        EventSpan::new(0, self.len() - 1)
    }

    pub fn events_in(&self, span: EventSpan) -> &[Event] {
        let end = span.end().min(self.len().saturating_sub(1));
        self.events.get(span.start()..=end).unwrap_or(&[])
    }

    // ─── Metadata ───────────────────────────────────────────────────────────

    pub fn index(&self) -> &LogIndex {
        &self.index
    }

    pub fn ability_info(&self, ability_id: i64) -> Option<&AbilityInfo> {
        let seq = *self.index.ability_infos.get(&ability_id)?;
        self.events[seq].as_ability_info()
    }

    pub fn effect_info(&self, ability_id: i64) -> Option<&EffectInfo> {
        let seq = *self.index.effect_infos.get(&ability_id)?;
        self.events[seq].as_effect_info()
    }

    pub fn player_unit(&self, unit_id: i64) -> Option<&UnitAdded> {
        let seq = *self.index.player_units.get(&unit_id)?;
        self.events[seq].as_unit_added()
    }

    pub fn unit_added(&self, sequence_id: SequenceId) -> Option<&UnitAdded> {
        self.get(sequence_id)?.as_unit_added()
    }

    /// Status of the end cast linked to a begin cast.
    pub fn cast_outcome(&self, begin_cast: SequenceId) -> Option<CastStatus> {
        let end = self.get(begin_cast)?.as_begin_cast()?.end_cast?;
        Some(self.get(end)?.as_end_cast()?.status)
    }

    pub fn cast_completed(&self, begin_cast: SequenceId) -> bool {
        self.cast_outcome(begin_cast) == Some(CastStatus::Completed)
    }

    pub fn cast_cancelled(&self, begin_cast: SequenceId) -> bool {
        self.cast_outcome(begin_cast) == Some(CastStatus::PlayerCancelled)
    }

    pub fn cast_interrupted(&self, begin_cast: SequenceId) -> bool {
        self.cast_outcome(begin_cast) == Some(CastStatus::Interrupted)
    }

    // ─── Resolution ─────────────────────────────────────────────────────────

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Run every cross-reference pass once.
    pub fn resolve(
        &mut self,
        diagnostics: &mut Diagnostics,
    ) -> Result<ResolutionReport, ResolveError> {
        crate::resolve::resolve(self, diagnostics)
    }

    pub(crate) fn resolution_parts(&mut self) -> (&mut [Event], &LogIndex) {
        (&mut self.events, &self.index)
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }
}

fn find_singleton(events: &[Event], event_type: EventType) -> Result<Option<SequenceId>, LogError> {
    let mut found = events
        .iter()
        .filter(|e| e.event_type() == event_type)
        .map(|e| e.sequence_id);
    let first = found.next();
    if let (Some(first), Some(second)) = (first, found.next()) {
        return Err(match event_type {
            EventType::BeginLog => LogError::DuplicateBeginLog { first, second },
            _ => LogError::DuplicateEndLog { first, second },
        });
    }
    Ok(first)
}
