//! Ability and effect metadata linking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::combat_log::{Event, EventKind, NO_ABILITY_ID, SequenceId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::log::LogIndex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityLinkSummary {
    pub linked: usize,
    pub missing: usize,
    /// Distinct ability ids without an `ABILITY_INFO` record.
    pub missing_ability_ids: usize,
}

struct Linker<'a> {
    index: &'a LogIndex,
    summary: AbilityLinkSummary,
    missing: BTreeSet<i64>,
}

impl Linker<'_> {
    fn ability(&mut self, ability_id: i64) -> Option<SequenceId> {
        let found = self.index.ability_infos.get(&ability_id).copied();
        if found.is_some() {
            self.summary.linked += 1;
        } else {
            self.summary.missing += 1;
            self.missing.insert(ability_id);
        }
        found
    }

    /// Infos of a list of ability ids. Empty slots (id 0) are skipped.
    fn abilities(&mut self, ability_ids: &[i64]) -> Vec<SequenceId> {
        ability_ids
            .iter()
            .filter(|&&id| id != NO_ABILITY_ID)
            .filter_map(|&id| self.ability(id))
            .collect()
    }
}

pub fn link_abilities(
    events: &mut [Event],
    index: &LogIndex,
    diagnostics: &mut Diagnostics,
) -> AbilityLinkSummary {
    let mut linker = Linker {
        index,
        summary: AbilityLinkSummary::default(),
        missing: BTreeSet::new(),
    };

    for event in events.iter_mut() {
        if let Some(targeting) = event.targeting_mut() {
            if targeting.ability_id != NO_ABILITY_ID {
                targeting.ability_info = linker.ability(targeting.ability_id);
            }
            continue;
        }
        match &mut event.kind {
            EventKind::AbilityInfo(info) => {
                info.effect_info = index.effect_infos.get(&info.ability_id).copied();
            }
            EventKind::EffectInfo(info) => {
                info.ability_info = index.ability_infos.get(&info.ability_id).copied();
                info.synergy_ability_info = info
                    .grants_synergy_ability_id
                    .and_then(|id| index.ability_infos.get(&id).copied());
            }
            EventKind::EndCast(end) => {
                end.ability_info = linker.ability(end.ability_id);
            }
            EventKind::PlayerInfo(info) => {
                info.passive_infos = linker.abilities(&info.passives);
                info.front_bar_infos = linker.abilities(&info.front_bar);
                info.back_bar_infos = linker.abilities(&info.back_bar);
            }
            _ => {}
        }
    }

    for ability_id in &linker.missing {
        diagnostics.debug(
            DiagnosticKind::MissingAbilityInfo,
            None,
            format!("no ability info for ability {ability_id}"),
        );
    }
    let mut summary = linker.summary;
    summary.missing_ability_ids = linker.missing.len();
    summary
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;

    #[test]
    fn links_metadata_and_ability_users() {
        let (log, _) = resolved_log(&[
            begin_log(1),
            ability_info(2, 10, "Crystal Fragments"),
            effect_info(3, 10, Some(20)),
            ability_info(4, 20, "Blood Altar"),
            player_added(5, 1, "Kynes"),
            unit_added(6, 2, "HOSTILE", false, "Ogre"),
            combat_event(7, 10, 1, 2),
            combat_event(8, 99, 1, 2),
            "9,PLAYER_INFO,1,[10,77],[1,1],[],[20,0],[]".to_string(),
            end_log(10),
        ]);
        let fragments = log.get(1).unwrap().as_ability_info().unwrap();
        assert_eq!(fragments.effect_info, Some(2));
        let effect = log.get(2).unwrap().as_effect_info().unwrap();
        assert_eq!(effect.ability_info, Some(1));
        assert_eq!(effect.synergy_ability_info, Some(3));

        let hit = log.get(6).unwrap().targeting().unwrap();
        assert_eq!(hit.ability_info, Some(1));
        assert_eq!(log.get(7).unwrap().targeting().unwrap().ability_info, None);

        let info = log.get(8).unwrap().as_player_info().unwrap();
        assert_eq!(info.passive_infos, vec![1]);
        assert_eq!(info.front_bar_infos, vec![3]);
        assert_eq!(info.unit, Some(4));
    }

    #[test]
    fn summary_counts_distinct_missing_ids() {
        let (mut log, mut diagnostics) = build_log(&[
            begin_log(1),
            unit_added(2, 2, "HOSTILE", false, "Ogre"),
            player_added(3, 1, "Kynes"),
            combat_event(4, 99, 1, 2),
            combat_event(5, 99, 1, 2),
            combat_event(6, 0, 1, 1),
            end_log(7),
        ]);
        let report = log.resolve(&mut diagnostics).unwrap();
        assert_eq!(report.abilities.linked, 0);
        assert_eq!(report.abilities.missing, 2);
        assert_eq!(report.abilities.missing_ability_ids, 1);
    }
}
