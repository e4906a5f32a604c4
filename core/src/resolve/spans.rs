//! Combat and trial span matching.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::combat_log::{Event, EventKind, SequenceId, TrialId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanMatchSummary {
    pub matched: usize,
    pub unmatched_begins: usize,
    pub unmatched_ends: usize,
}

/// Pair each `BEGIN_COMBAT` with the next `END_COMBAT`.
///
/// A begin while another combat is open replaces it; the earlier begin stays
/// unmatched.
pub fn match_combats(events: &mut [Event], diagnostics: &mut Diagnostics) -> SpanMatchSummary {
    let mut summary = SpanMatchSummary::default();
    let mut open: Option<SequenceId> = None;

    for seq in 0..events.len() {
        match events[seq].kind {
            EventKind::BeginCombat(_) => {
                if let Some(previous) = open {
                    summary.unmatched_begins += 1;
                    diagnostics.error(
                        DiagnosticKind::NestedCombat,
                        Some(seq),
                        format!("combat began while combat from {previous} is still open"),
                    );
                }
                open = Some(seq);
            }
            EventKind::EndCombat(_) => {
                let Some(begin) = open.take() else {
                    summary.unmatched_ends += 1;
                    diagnostics.error(
                        DiagnosticKind::UnmatchedCombat,
                        Some(seq),
                        "combat ended without being in combat",
                    );
                    continue;
                };
                if let Some(begin_combat) = events[begin].as_begin_combat_mut() {
                    begin_combat.end_combat = Some(seq);
                }
                if let Some(end_combat) = events[seq].as_end_combat_mut() {
                    end_combat.begin_combat = Some(begin);
                }
                summary.matched += 1;
            }
            _ => {}
        }
    }

    if let Some(begin) = open {
        summary.unmatched_begins += 1;
        diagnostics.warn(
            DiagnosticKind::UnmatchedCombat,
            Some(begin),
            "combat still open at the end of the log",
        );
    }
    summary
}

/// Pair trials and record the open trial on each `BEGIN_COMBAT`.
///
/// A trial still open at the end of the log is reported, not treated as an
/// error.
pub fn match_trials(events: &mut [Event], diagnostics: &mut Diagnostics) -> SpanMatchSummary {
    let mut summary = SpanMatchSummary::default();
    let mut open_by_trial: HashMap<TrialId, SequenceId> = HashMap::new();
    let mut current: Option<SequenceId> = None;

    for seq in 0..events.len() {
        match &mut events[seq].kind {
            EventKind::BeginTrial(begin) => {
                if let Some(previous) = open_by_trial.insert(begin.trial_id, seq) {
                    summary.unmatched_begins += 1;
                    diagnostics.info(
                        DiagnosticKind::UnmatchedTrial,
                        Some(previous),
                        format!("trial {} began again before ending", begin.trial_id),
                    );
                }
                current = Some(seq);
            }
            EventKind::EndTrial(end) => {
                current = None;
                let Some(begin) = open_by_trial.remove(&end.trial_id) else {
                    summary.unmatched_ends += 1;
                    diagnostics.warn(
                        DiagnosticKind::UnmatchedTrial,
                        Some(seq),
                        format!("trial {} ended without a matching begin", end.trial_id),
                    );
                    continue;
                };
                end.begin_trial = Some(begin);
                if let Some(begin_trial) = events[begin].as_begin_trial_mut() {
                    begin_trial.end_trial = Some(seq);
                }
                summary.matched += 1;
            }
            EventKind::BeginCombat(begin) => begin.begin_trial = current,
            _ => {}
        }
    }

    let mut still_open: Vec<_> = open_by_trial.into_iter().collect();
    still_open.sort_unstable_by_key(|&(_, begin)| begin);
    for (trial_id, begin) in still_open {
        summary.unmatched_begins += 1;
        diagnostics.info(
            DiagnosticKind::UnmatchedTrial,
            Some(begin),
            format!("trial {trial_id} still open at the end of the log"),
        );
    }
    summary
}
