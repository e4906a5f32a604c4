//! Buff and debuff uptime on the hostile units of an encounter.

use std::collections::BTreeMap;

use crate::combat_log::{EffectChangedStatus, EventKind, SequenceId};
use crate::log::{EncounterLog, EventSpan};

use super::CombatEncounter;

/// Merged windows of one ability on one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectUptime {
    pub ability_id: i64,
    pub windows: Vec<EventSpan>,
    /// Share of the unit's active time covered by the windows, `0.0..=1.0`.
    pub uptime: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitUptimes {
    /// `UNIT_ADDED` event of the unit.
    pub unit: SequenceId,
    /// First to last combat event targeting the unit.
    pub active_span: EventSpan,
    /// Ordered by ability id.
    pub effects: Vec<EffectUptime>,
}

/// Uptimes for every hostile unit of an encounter that was targeted.
pub fn encounter_uptimes(log: &EncounterLog, encounter: &CombatEncounter) -> Vec<UnitUptimes> {
    encounter
        .hostile_units
        .iter()
        .filter_map(|&unit| unit_uptimes(log, encounter, unit))
        .collect()
}

pub fn active_span(
    log: &EncounterLog,
    encounter: &CombatEncounter,
    unit: SequenceId,
) -> Option<EventSpan> {
    let mut targeted = encounter.span().iter(log).filter(|event| {
        event
            .as_combat_event()
            .is_some_and(|combat| combat.targeting.target_unit == Some(unit))
    });
    let first = targeted.next()?.sequence_id;
    let last = targeted.last().map_or(first, |event| event.sequence_id);
    Some(EventSpan::new(first, last))
}

/// Effect windows on one unit, clipped to its active span.
///
/// Windows pair `GAINED` with `FADED` per ability and source unit. A `FADED`
/// with nothing open starts at the active-span start; a window still open
/// closes at the active-span end.
pub fn unit_uptimes(
    log: &EncounterLog,
    encounter: &CombatEncounter,
    unit: SequenceId,
) -> Option<UnitUptimes> {
    let active = active_span(log, encounter, unit)?;

    let mut open: BTreeMap<(i64, Option<SequenceId>), Option<SequenceId>> = BTreeMap::new();
    let mut windows: BTreeMap<i64, Vec<EventSpan>> = BTreeMap::new();

    for event in encounter.span().iter(log) {
        let EventKind::EffectChanged(effect) = &event.kind else {
            continue;
        };
        let targeting = &effect.targeting;
        if targeting.target_unit != Some(unit) {
            continue;
        }
        let slot = open
            .entry((targeting.ability_id, targeting.unit))
            .or_default();
        match effect.status {
            EffectChangedStatus::Gained => {
                slot.get_or_insert(event.sequence_id);
            }
            EffectChangedStatus::Faded => {
                let start = slot.take().unwrap_or(active.start());
                if let Some(window) = clip(start, event.sequence_id, active) {
                    windows.entry(targeting.ability_id).or_default().push(window);
                }
            }
            EffectChangedStatus::Updated => {}
        }
    }
    for ((ability_id, _), start) in open {
        if let Some(window) = start.and_then(|start| clip(start, active.end(), active)) {
            windows.entry(ability_id).or_default().push(window);
        }
    }

    let effects = windows
        .into_iter()
        .map(|(ability_id, windows)| {
            let windows = merge_windows(windows);
            let uptime = coverage(log, active, &windows);
            EffectUptime {
                ability_id,
                windows,
                uptime,
            }
        })
        .collect();

    Some(UnitUptimes {
        unit,
        active_span: active,
        effects,
    })
}

/// The part of `[start, end]` inside `active`.
fn clip(start: SequenceId, end: SequenceId, active: EventSpan) -> Option<EventSpan> {
    let start = start.max(active.start());
    let end = end.min(active.end());
    (start <= end).then(|| EventSpan::new(start, end))
}

/// Sort and merge overlapping windows.
pub fn merge_windows(mut windows: Vec<EventSpan>) -> Vec<EventSpan> {
    windows.sort();
    let mut merged: Vec<EventSpan> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) => match last.merge(&window) {
                Ok(union) => *last = union,
                Err(_) => merged.push(window),
            },
            None => merged.push(window),
        }
    }
    merged
}

/// Covered share of `active` by time, or by event count when no time elapsed.
fn coverage(log: &EncounterLog, active: EventSpan, windows: &[EventSpan]) -> f64 {
    let total_ms = active
        .duration(log)
        .map_or(0, |d| d.num_milliseconds());
    let fraction = if total_ms > 0 {
        let covered: i64 = windows
            .iter()
            .filter_map(|w| w.duration(log))
            .map(|d| d.num_milliseconds())
            .sum();
        covered as f64 / total_ms as f64
    } else {
        let covered: usize = windows.iter().map(EventSpan::len).sum();
        covered as f64 / active.len() as f64
    };
    fraction.clamp(0.0, 1.0)
}
