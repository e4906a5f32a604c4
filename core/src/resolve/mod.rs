//! Cross-reference resolution.
//!
//! Each pass is a full ascending scan over the log's events writing a disjoint
//! set of back-references. Resolution runs once per log.

mod abilities;
mod casts;
mod spans;
mod units;


use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat_log::SequenceId;
use crate::diagnostics::Diagnostics;
use crate::log::EncounterLog;

pub use abilities::{AbilityLinkSummary, link_abilities};
pub use casts::{CastMatchSummary, match_casts};
pub use spans::{SpanMatchSummary, match_combats, match_trials};
pub use units::{UnitMatchSummary, match_units};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("log has already been resolved")]
    AlreadyResolved,
    #[error("log must be resolved first")]
    NotResolved,
}

/// Outcome counts of every resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub abilities: AbilityLinkSummary,
    pub casts: CastMatchSummary,
    pub units: UnitMatchSummary,
    pub combats: SpanMatchSummary,
    pub trials: SpanMatchSummary,
}

pub fn resolve(
    log: &mut EncounterLog,
    diagnostics: &mut Diagnostics,
) -> Result<ResolutionReport, ResolveError> {
    if log.is_resolved() {
        return Err(ResolveError::AlreadyResolved);
    }

    let (events, index) = log.resolution_parts();
    let report = ResolutionReport {
        abilities: link_abilities(events, index, diagnostics),
        casts: match_casts(events, diagnostics),
        units: match_units(events, diagnostics),
        combats: match_combats(events, diagnostics),
        trials: match_trials(events, diagnostics),
    };
    log.mark_resolved();

    tracing::info!(
        events = log.len(),
        casts = report.casts.begin_casts,
        unmatched_begin_casts = report.casts.unmatched_begins,
        units = report.units.units_added,
        combats = report.combats.matched,
        trials = report.trials.matched,
        "Resolved log"
    );
    Ok(report)
}

/// Insert into a sorted list unless already present.
pub(crate) fn push_unique(list: &mut Vec<SequenceId>, seq: SequenceId) -> bool {
    match list.binary_search(&seq) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, seq);
            true
        }
    }
}
