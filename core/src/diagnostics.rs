//! Diagnostics sink passed into every pass.
//!
//! Findings are kept as data (so callers and tests can inspect them) and are
//! also emitted as `tracing` events with structured fields.

use serde::Serialize;

use crate::combat_log::SequenceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A row was kept as an error stub.
    RowConversion,
    /// An event's time could not be assigned.
    TimeAssignment,
    /// Events discarded after the end of a log.
    TrailingEvents,
    /// Duplicate ability or effect metadata.
    DuplicateInfo,
    MissingAbilityInfo,
    CastAmbiguity,
    UnmatchedCast,
    OrphanEndCast,
    DuplicateUnit,
    UnknownUnit,
    NestedCombat,
    UnmatchedCombat,
    UnmatchedTrial,
    Encounter,
    /// A sub-log could not be constructed.
    LogRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub sequence_id: Option<SequenceId>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        sequence_id: Option<SequenceId>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match severity {
            Severity::Debug => tracing::debug!(?kind, ?sequence_id, "{message}"),
            Severity::Info => tracing::info!(?kind, ?sequence_id, "{message}"),
            Severity::Warning => tracing::warn!(?kind, ?sequence_id, "{message}"),
            Severity::Error => tracing::error!(?kind, ?sequence_id, "{message}"),
        }
        self.entries.push(Diagnostic {
            severity,
            kind,
            sequence_id,
            message,
        });
    }

    pub fn debug(&mut self, kind: DiagnosticKind, seq: Option<SequenceId>, msg: impl Into<String>) {
        self.record(Severity::Debug, kind, seq, msg);
    }

    pub fn info(&mut self, kind: DiagnosticKind, seq: Option<SequenceId>, msg: impl Into<String>) {
        self.record(Severity::Info, kind, seq, msg);
    }

    pub fn warn(&mut self, kind: DiagnosticKind, seq: Option<SequenceId>, msg: impl Into<String>) {
        self.record(Severity::Warning, kind, seq, msg);
    }

    pub fn error(&mut self, kind: DiagnosticKind, seq: Option<SequenceId>, msg: impl Into<String>) {
        self.record(Severity::Error, kind, seq, msg);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Number of entries at or above a severity.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity >= severity).count()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_filters() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(DiagnosticKind::CastAmbiguity, Some(4), "two completed ends");
        diagnostics.error(DiagnosticKind::UnknownUnit, Some(9), "unit 3 not alive");
        diagnostics.debug(DiagnosticKind::MissingAbilityInfo, None, "no info for 12");

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.count(DiagnosticKind::CastAmbiguity), 1);
        assert_eq!(diagnostics.count_at_least(Severity::Warning), 2);
        let unit = diagnostics.of_kind(DiagnosticKind::UnknownUnit).next().unwrap();
        assert_eq!(unit.sequence_id, Some(9));
        assert_eq!(unit.severity, Severity::Error);
    }

    #[test]
    fn extend_keeps_order() {
        let mut first = Diagnostics::new();
        first.info(DiagnosticKind::TrailingEvents, None, "a");
        let mut second = Diagnostics::new();
        second.info(DiagnosticKind::LogRejected, None, "b");
        first.extend(second);
        let messages: Vec<_> = first.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }
}
