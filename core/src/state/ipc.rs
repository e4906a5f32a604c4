//! Serializable parse-worker output.
//!
//! The binary prints one [`ParseWorkerOutput`] as JSON; consumers deserialize
//! the same structs.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::combat_log::{ClassId, Locale, Server, UnitAdded};
use crate::diagnostics::{Diagnostics, Severity};
use crate::encounter::summary::TIME_FORMAT;
use crate::encounter::{EncounterSummary, segment};
use crate::loading::{LoadedFile, ParseMode, RejectedLog};
use crate::log::EncounterLog;
use crate::resolve::ResolutionReport;

/// A player seen in a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPlayerInfo {
    pub unit_id: i64,
    pub name: String,
    pub account: String,
    pub class_id: ClassId,
    pub is_local_player: bool,
}

impl WorkerPlayerInfo {
    pub fn from_unit(unit: &UnitAdded) -> Self {
        Self {
            unit_id: unit.unit_id,
            name: unit.name.clone(),
            account: unit.account.clone(),
            class_id: unit.class_id,
            is_local_player: unit.is_local_player,
        }
    }
}

/// One resolved and segmented log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    /// ISO 8601 formatted time of `BEGIN_LOG`.
    pub begin_time: Option<String>,
    pub end_time: Option<String>,
    pub server: Option<Server>,
    pub locale: Option<Locale>,
    pub client_version: Option<String>,
    pub event_count: usize,
    pub error_stub_count: usize,
    pub resolution: ResolutionReport,
    pub players: Vec<WorkerPlayerInfo>,
    pub encounters: Vec<EncounterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLogSummary {
    pub first_line: usize,
    pub event_count: usize,
    pub error: String,
}

impl From<&RejectedLog> for RejectedLogSummary {
    fn from(rejected: &RejectedLog) -> Self {
        Self {
            first_line: rejected.first_line,
            event_count: rejected.event_count,
            error: rejected.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWorkerOutput {
    pub path: String,
    /// Physical lines in the file.
    pub line_count: usize,
    pub parallel_chunks: Option<usize>,
    pub logs: Vec<LogSummary>,
    pub rejected: Vec<RejectedLogSummary>,
    pub warning_count: usize,
    pub error_count: usize,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u128,
}

impl LogSummary {
    /// Resolve and segment a log, then summarize it.
    pub fn build(log: &mut EncounterLog, diagnostics: &mut Diagnostics) -> Self {
        let resolution = match log.resolve(diagnostics) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Summarizing without a fresh resolution report");
                ResolutionReport::default()
            }
        };
        let encounters = segment(log, diagnostics)
            .unwrap_or_default()
            .iter()
            .map(|encounter| EncounterSummary::new(log, encounter))
            .collect();

        let begin = log.begin_log();
        let players = log
            .events()
            .iter()
            .filter_map(|e| e.as_unit_added())
            .filter(|unit| unit.is_player())
            .map(WorkerPlayerInfo::from_unit)
            .collect();

        Self {
            begin_time: log.begin_time().map(|t| t.format(TIME_FORMAT).to_string()),
            end_time: log.end_time().map(|t| t.format(TIME_FORMAT).to_string()),
            server: begin.map(|b| b.server),
            locale: begin.map(|b| b.locale),
            client_version: begin.map(|b| b.client_version.clone()),
            event_count: log.len(),
            error_stub_count: log.error_stub_count(),
            resolution,
            players,
            encounters,
        }
    }
}

impl ParseWorkerOutput {
    /// Resolve, segment and summarize every log of a loaded file.
    pub fn from_loaded(mut loaded: LoadedFile, started: Instant) -> Self {
        let mut diagnostics = std::mem::take(&mut loaded.diagnostics);
        let logs = loaded
            .logs
            .iter_mut()
            .map(|log| LogSummary::build(log, &mut diagnostics))
            .collect();

        Self {
            path: loaded.path.display().to_string(),
            line_count: loaded.line_count,
            parallel_chunks: match loaded.mode {
                ParseMode::Sequential => None,
                ParseMode::Parallel { chunks, .. } => Some(chunks),
            },
            logs,
            rejected: loaded.rejected.iter().map(RejectedLogSummary::from).collect(),
            warning_count: diagnostics.count_at_least(Severity::Warning)
                - diagnostics.count_at_least(Severity::Error),
            error_count: diagnostics.count_at_least(Severity::Error),
            elapsed_ms: started.elapsed().as_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn summarizes_a_log() {
        let (mut log, mut diagnostics) = build_log(&[
            begin_log(1),
            player_added(2, 1, "Kynes"),
            unit_added(3, 7, "HOSTILE", true, "Ogre"),
            begin_combat(100),
            combat_event_with_health(150, 10, 1, 7, 0),
            end_combat(200),
            end_log(300),
        ]);

        let summary = LogSummary::build(&mut log, &mut diagnostics);
        assert!(log.is_resolved());
        assert_eq!(summary.event_count, 7);
        assert_eq!(summary.server, Some(Server::Na));
        assert_eq!(summary.players.len(), 1);
        assert_eq!(summary.players[0].name, "Kynes");
        assert_eq!(summary.encounters.len(), 1);
        assert_eq!(summary.begin_time.as_deref(), Some("2023-11-14T22:13:20.000"));
        assert_eq!(summary.end_time.as_deref(), Some("2023-11-14T22:13:20.299"));
        assert_eq!(summary.encounters[0].display_name, "Ogre");
        assert_eq!(
            summary.encounters[0].start_time.as_deref(),
            Some("2023-11-14T22:13:20.099")
        );
        assert!(summary.encounters[0].hostile_units[0].was_killed);
        assert_eq!(summary.resolution.combats.matched, 1);

        let json = serde_json::to_string(&summary).unwrap();
        let back: LogSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
