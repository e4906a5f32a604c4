//! Encounter segmentation.
//!
//! An encounter is a run of matched combat spans whose gaps are shorter than
//! [`MERGE_GAP_MS`]. Each encounter records the hostile units that were
//! actually fought during it.

pub mod summary;
pub mod uptime;

#[cfg(test)]
mod encounter_tests;

use std::collections::BTreeSet;

use chrono::{NaiveDateTime, TimeDelta};
use hashbrown::HashMap;

use crate::combat_log::{EventKind, Hostility, SequenceId, TrialId, UnitAdded};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::log::{EncounterLog, EventSpan};
use crate::resolve::ResolveError;

pub use summary::{EffectUptimeSummary, EncounterSummary, HostileUnitSummary};
pub use uptime::{EffectUptime, UnitUptimes, encounter_uptimes, unit_uptimes};

/// Combat spans closer than this are part of the same encounter.
pub const MERGE_GAP_MS: i64 = 2_000;

/// Name used for encounters without a boss.
pub const TRASH_NAME: &str = "Trash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatEncounter {
    /// Position among the log's encounters.
    pub index: usize,
    /// First `BEGIN_COMBAT` of the encounter.
    pub begin_combat: SequenceId,
    /// Last `END_COMBAT` of the encounter.
    pub end_combat: SequenceId,
    pub combat_spans: Vec<EventSpan>,
    /// `UNIT_ADDED` events of the hostile units fought, ascending.
    pub hostile_units: Vec<SequenceId>,
    /// Trial open when the encounter began.
    pub begin_trial: Option<SequenceId>,
}

impl CombatEncounter {
    pub fn span(&self) -> EventSpan {
        EventSpan::new(self.begin_combat, self.end_combat)
    }

    pub fn start_time(&self, log: &EncounterLog) -> Option<NaiveDateTime> {
        log.get(self.begin_combat)?.time()
    }

    pub fn end_time(&self, log: &EncounterLog) -> Option<NaiveDateTime> {
        log.get(self.end_combat)?.time()
    }

    pub fn duration(&self, log: &EncounterLog) -> Option<TimeDelta> {
        self.span().duration(log)
    }

    pub fn hostile_units<'a>(
        &'a self,
        log: &'a EncounterLog,
    ) -> impl Iterator<Item = (SequenceId, &'a UnitAdded)> + 'a {
        self.hostile_units
            .iter()
            .filter_map(|&seq| Some((seq, log.unit_added(seq)?)))
    }

    pub fn boss_units<'a>(
        &'a self,
        log: &'a EncounterLog,
    ) -> impl Iterator<Item = &'a UnitAdded> + 'a {
        self.hostile_units(log)
            .map(|(_, unit)| unit)
            .filter(|unit| unit.is_boss)
    }

    pub fn is_boss_encounter(&self, log: &EncounterLog) -> bool {
        self.boss_units(log).next().is_some()
    }

    /// The first boss's name, or [`TRASH_NAME`].
    pub fn display_name(&self, log: &EncounterLog) -> String {
        self.boss_units(log)
            .next()
            .map_or_else(|| TRASH_NAME.to_string(), |unit| unit.name.clone())
    }

    pub fn trial_id(&self, log: &EncounterLog) -> Option<TrialId> {
        let begin = self.begin_trial?;
        Some(log.get(begin)?.as_begin_trial()?.trial_id)
    }

    /// Whether the last combat event of the encounter that targeted the unit
    /// left it with no health.
    pub fn was_killed(&self, log: &EncounterLog, unit: SequenceId) -> bool {
        self.span()
            .iter(log)
            .rev()
            .filter_map(|event| event.as_combat_event())
            .find(|combat| combat.targeting.target_unit == Some(unit))
            .and_then(|combat| combat.targeting.target.as_ref())
            .is_some_and(|target| target.health.is_empty())
    }
}

/// Hostility of a unit at a position, taking its latest change into account.
pub fn hostility_at(log: &EncounterLog, unit: SequenceId, at: SequenceId) -> Option<Hostility> {
    let added = log.unit_added(unit)?;
    let changed = added
        .unit_changed
        .iter()
        .rev()
        .find(|&&seq| seq <= at)
        .and_then(|&seq| log.get(seq)?.as_unit_changed());
    Some(changed.map_or(added.hostility, |change| change.hostility))
}

/// Split a resolved log into encounters.
///
/// A `BEGIN_COMBAT` without an `END_COMBAT` is reported and left out.
pub fn segment(
    log: &EncounterLog,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CombatEncounter>, ResolveError> {
    if !log.is_resolved() {
        return Err(ResolveError::NotResolved);
    }

    let mut groups: Vec<(Vec<EventSpan>, Option<SequenceId>)> = Vec::new();
    for event in log.events() {
        let EventKind::BeginCombat(begin) = &event.kind else {
            continue;
        };
        let Some(end) = begin.end_combat else {
            diagnostics.warn(
                DiagnosticKind::Encounter,
                Some(event.sequence_id),
                "BEGIN_COMBAT has no matching END_COMBAT; excluded from encounters",
            );
            continue;
        };
        let span = EventSpan::new(event.sequence_id, end);

        let previous_end = groups
            .last()
            .and_then(|(spans, _)| spans.last())
            .map(|span| span.end());
        match previous_end {
            Some(previous) if within_merge_gap(log, previous, span.start()) => {
                if let Some((spans, _)) = groups.last_mut() {
                    spans.push(span);
                }
            }
            _ => groups.push((vec![span], begin.begin_trial)),
        }
    }

    let encounters: Vec<CombatEncounter> = groups
        .into_iter()
        .enumerate()
        .filter_map(|(index, (combat_spans, begin_trial))| {
            let begin_combat = combat_spans.first()?.start();
            let end_combat = combat_spans.last()?.end();
            let mut encounter = CombatEncounter {
                index,
                begin_combat,
                end_combat,
                combat_spans,
                hostile_units: Vec::new(),
                begin_trial,
            };
            encounter.hostile_units = find_hostile_units(log, encounter.span());
            Some(encounter)
        })
        .collect();

    tracing::debug!(encounters = encounters.len(), "Segmented log");
    Ok(encounters)
}

fn within_merge_gap(log: &EncounterLog, end: SequenceId, begin: SequenceId) -> bool {
    let gap = log
        .get(end)
        .and_then(|e| e.time())
        .zip(log.get(begin).and_then(|e| e.time()))
        .map(|(end, begin)| begin - end);
    gap.is_some_and(|gap| gap < TimeDelta::milliseconds(MERGE_GAP_MS))
}

/// Hostile units that a combat event targeted during the span while they
/// were hostile.
fn find_hostile_units(log: &EncounterLog, span: EventSpan) -> Vec<SequenceId> {
    // Hostility per unit as last seen inside the span.
    let mut tracked: HashMap<SequenceId, bool> = HashMap::new();
    let mut fought = BTreeSet::new();

    for event in span.iter(log) {
        match &event.kind {
            EventKind::UnitAdded(unit) => {
                tracked.insert(event.sequence_id, unit.hostility == Hostility::Hostile);
            }
            EventKind::UnitChanged(change) => {
                if let Some(added) = change.unit_added {
                    tracked.insert(added, change.hostility == Hostility::Hostile);
                }
            }
            EventKind::CombatEvent(combat) => {
                let Some(target) = combat.targeting.target_unit else {
                    continue;
                };
                if fought.contains(&target) {
                    continue;
                }
                // Units added before the span are first seen here.
                let hostile = *tracked.entry(target).or_insert_with(|| {
                    hostility_at(log, target, event.sequence_id) == Some(Hostility::Hostile)
                });
                if hostile {
                    fought.insert(target);
                }
            }
            _ => {}
        }
    }

    fought.into_iter().collect()
}
