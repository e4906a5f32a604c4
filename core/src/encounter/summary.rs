//! Serializable encounter summaries.

use serde::{Deserialize, Serialize};

use super::CombatEncounter;
use super::uptime::{UnitUptimes, encounter_uptimes};
use crate::combat_log::{SequenceId, TrialId};
use crate::log::EncounterLog;

/// ISO 8601 with milliseconds, used for every serialized time.
pub(crate) const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Summary of one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub index: usize,
    pub display_name: String,
    /// ISO 8601 formatted start time (or None if unknown)
    pub start_time: Option<String>,
    /// ISO 8601 formatted end time (or None if unknown)
    pub end_time: Option<String>,
    pub duration_ms: Option<i64>,
    pub begin_combat: SequenceId,
    pub end_combat: SequenceId,
    pub combat_spans: usize,
    pub is_boss_encounter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial: Option<TrialId>,
    pub hostile_units: Vec<HostileUnitSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileUnitSummary {
    pub unit_id: i64,
    pub name: String,
    pub is_boss: bool,
    pub was_killed: bool,
    /// Effect uptimes keyed by ability, ordered by ability id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uptimes: Vec<EffectUptimeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectUptimeSummary {
    pub ability_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_name: Option<String>,
    pub uptime: f64,
    pub windows: usize,
}

impl EncounterSummary {
    pub fn new(log: &EncounterLog, encounter: &CombatEncounter) -> Self {
        let uptimes = encounter_uptimes(log, encounter);
        let hostile_units = encounter
            .hostile_units(log)
            .map(|(seq, unit)| HostileUnitSummary {
                unit_id: unit.unit_id,
                name: unit.name.clone(),
                is_boss: unit.is_boss,
                was_killed: encounter.was_killed(log, seq),
                uptimes: uptimes
                    .iter()
                    .find(|u| u.unit == seq)
                    .map(|u| effect_summaries(log, u))
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            index: encounter.index,
            display_name: encounter.display_name(log),
            start_time: encounter
                .start_time(log)
                .map(|t| t.format(TIME_FORMAT).to_string()),
            end_time: encounter
                .end_time(log)
                .map(|t| t.format(TIME_FORMAT).to_string()),
            duration_ms: encounter.duration(log).map(|d| d.num_milliseconds()),
            begin_combat: encounter.begin_combat,
            end_combat: encounter.end_combat,
            combat_spans: encounter.combat_spans.len(),
            is_boss_encounter: encounter.is_boss_encounter(log),
            trial: encounter.trial_id(log),
            hostile_units,
        }
    }
}

fn effect_summaries(log: &EncounterLog, unit: &UnitUptimes) -> Vec<EffectUptimeSummary> {
    unit.effects
        .iter()
        .map(|effect| EffectUptimeSummary {
            ability_id: effect.ability_id,
            ability_name: log.ability_info(effect.ability_id).map(|info| info.name.clone()),
            uptime: effect.uptime,
            windows: effect.windows.len(),
        })
        .collect()
}
