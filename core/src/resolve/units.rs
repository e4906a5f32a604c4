//! Unit lifecycle matching.
//!
//! Unit ids are reused once a unit is removed, so units are tracked in one
//! ascending scan over a map of currently live units. Every event that names a
//! unit is linked to whichever unit holds that id at its position.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::push_unique;
use crate::combat_log::{Event, EventKind, SequenceId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMatchSummary {
    pub units_added: usize,
    pub units_removed: usize,
    pub changes: usize,
    pub duplicate_adds: usize,
    pub unknown_references: usize,
    pub alive_at_end: usize,
}

enum UnitRef {
    Added { unit_id: i64, owner_unit_id: i64 },
    Changed(i64),
    Removed(i64),
    /// Health regeneration or player info about a single unit.
    Subject(i64),
    Targeted { source: i64, target: Option<i64> },
}

fn unit_ref(event: &Event) -> Option<UnitRef> {
    let unit_ref = match &event.kind {
        EventKind::UnitAdded(unit) => UnitRef::Added {
            unit_id: unit.unit_id,
            owner_unit_id: unit.owner_unit_id,
        },
        EventKind::UnitChanged(unit) => UnitRef::Changed(unit.unit_id),
        EventKind::UnitRemoved(unit) => UnitRef::Removed(unit.unit_id),
        EventKind::HealthRegen(regen) => UnitRef::Subject(regen.state.unit_id),
        EventKind::PlayerInfo(info) => UnitRef::Subject(info.unit_id),
        _ => {
            let targeting = event.targeting()?;
            UnitRef::Targeted {
                source: targeting.unit_id(),
                target: targeting.target_unit_id(),
            }
        }
    };
    Some(unit_ref)
}

struct LiveUnits<'d> {
    live: HashMap<i64, SequenceId>,
    summary: UnitMatchSummary,
    diagnostics: &'d mut Diagnostics,
}

impl LiveUnits<'_> {
    /// Live unit for an id referenced at `seq`. Id 0 means "no unit".
    fn lookup(&mut self, unit_id: i64, seq: SequenceId, role: &str) -> Option<SequenceId> {
        if unit_id == 0 {
            return None;
        }
        let found = self.live.get(&unit_id).copied();
        if found.is_none() {
            self.summary.unknown_references += 1;
            self.diagnostics.error(
                DiagnosticKind::UnknownUnit,
                Some(seq),
                format!("no live unit with id {unit_id} for {role}"),
            );
        }
        found
    }
}

pub fn match_units(events: &mut [Event], diagnostics: &mut Diagnostics) -> UnitMatchSummary {
    let mut units = LiveUnits {
        live: HashMap::new(),
        summary: UnitMatchSummary::default(),
        diagnostics,
    };

    for seq in 0..events.len() {
        let Some(unit_ref) = unit_ref(&events[seq]) else {
            continue;
        };
        match unit_ref {
            UnitRef::Added {
                unit_id,
                owner_unit_id,
            } => {
                if let Some(&previous) = units.live.get(&unit_id) {
                    units.summary.duplicate_adds += 1;
                    units.diagnostics.error(
                        DiagnosticKind::DuplicateUnit,
                        Some(seq),
                        format!("unit {unit_id} added again while still alive from {previous}"),
                    );
                    continue;
                }
                let owner = units.lookup(owner_unit_id, seq, "owner");
                if let Some(unit) = events[seq].as_unit_added_mut() {
                    unit.owner_unit = owner;
                }
                units.live.insert(unit_id, seq);
                units.summary.units_added += 1;
            }
            UnitRef::Changed(unit_id) => {
                let Some(added) = units.lookup(unit_id, seq, "unit change") else {
                    continue;
                };
                if let Some(unit) = events[added].as_unit_added_mut() {
                    push_unique(&mut unit.unit_changed, seq);
                }
                if let Some(change) = events[seq].as_unit_changed_mut() {
                    change.unit_added = Some(added);
                }
                units.summary.changes += 1;
            }
            UnitRef::Removed(unit_id) => {
                let Some(added) = units.lookup(unit_id, seq, "unit removal") else {
                    continue;
                };
                units.live.remove(&unit_id);
                if let Some(unit) = events[added].as_unit_added_mut() {
                    unit.unit_removed = Some(seq);
                }
                if let Some(removal) = events[seq].as_unit_removed_mut() {
                    removal.unit_added = Some(added);
                }
                units.summary.units_removed += 1;
            }
            UnitRef::Subject(unit_id) => {
                let unit = units.lookup(unit_id, seq, "unit state");
                match &mut events[seq].kind {
                    EventKind::HealthRegen(regen) => regen.unit = unit,
                    EventKind::PlayerInfo(info) => info.unit = unit,
                    _ => {}
                }
            }
            UnitRef::Targeted { source, target } => {
                let unit = units.lookup(source, seq, "source");
                let target_unit = target.and_then(|target| units.lookup(target, seq, "target"));
                if let Some(targeting) = events[seq].targeting_mut() {
                    targeting.unit = unit;
                    targeting.target_unit = target_unit;
                }
            }
        }
    }

    let mut summary = units.summary;
    summary.alive_at_end = units.live.len();
    summary
}
