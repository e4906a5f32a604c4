use super::*;
use crate::combat_log::TrialId;
use crate::test_support::*;

fn encounters(lines: &[String]) -> (EncounterLog, Vec<CombatEncounter>, Diagnostics) {
    let (log, mut diagnostics) = resolved_log(lines);
    let encounters = segment(&log, &mut diagnostics).unwrap();
    (log, encounters, diagnostics)
}

#[test]
fn single_combat_round_trip() {
    let (log, encounters, _) = encounters(&[
        begin_log(1),
        unit_added(2, 7, "HOSTILE", false, "Ogre"),
        begin_combat(3),
        combat_event(4, 10, 0, 7),
        end_combat(5),
        end_log(6),
    ]);

    assert_eq!(encounters.len(), 1);
    let encounter = &encounters[0];
    assert_eq!(encounter.begin_combat, 2);
    assert_eq!(encounter.end_combat, 4);
    assert_eq!(encounter.hostile_units, vec![1]);
    assert_eq!(
        log.get(encounter.end_combat)
            .and_then(|e| e.as_end_combat())
            .and_then(|end| end.begin_combat),
        Some(encounter.begin_combat)
    );
    assert_eq!(encounter.display_name(&log), TRASH_NAME);
    assert!(!encounter.is_boss_encounter(&log));
}

#[test]
fn log_without_combat_has_no_encounters() {
    let (_, encounters, diagnostics) = encounters(&[begin_log(1), end_log(2)]);
    assert!(encounters.is_empty());
    assert_eq!(diagnostics.count(DiagnosticKind::Encounter), 0);
}

#[test]
fn unmatched_final_combat_is_excluded() {
    let (_, encounters, diagnostics) = encounters(&[
        begin_log(1),
        begin_combat(100),
        end_combat(200),
        begin_combat(10_000),
        end_log(11_000),
    ]);
    assert_eq!(encounters.len(), 1);
    assert_eq!(encounters[0].begin_combat, 1);
    let warning = diagnostics.of_kind(DiagnosticKind::Encounter).next().unwrap();
    assert_eq!(warning.sequence_id, Some(3));
}

#[test]
fn short_gaps_merge_combats() {
    let (_, encounters, _) = encounters(&[
        begin_log(1),
        begin_combat(1_000),
        end_combat(5_000),
        begin_combat(6_500),
        end_combat(9_000),
        begin_combat(11_000),
        end_combat(15_000),
        end_log(16_000),
    ]);

    assert_eq!(encounters.len(), 2);
    assert_eq!(
        encounters[0].combat_spans,
        vec![EventSpan::new(1, 2), EventSpan::new(3, 4)]
    );
    assert_eq!(encounters[0].end_combat, 4);
    assert_eq!(encounters[1].index, 1);
    assert_eq!(encounters[1].span(), EventSpan::new(5, 6));
}

#[test]
fn gap_of_exactly_two_seconds_starts_new_encounter() {
    let (_, encounters, _) = encounters(&[
        begin_log(1),
        begin_combat(1_000),
        end_combat(3_000),
        begin_combat(5_000),
        end_combat(6_000),
        end_log(7_000),
    ]);
    assert_eq!(encounters.len(), 2);
}

#[test]
fn only_fought_hostile_units_are_kept() {
    let (log, encounters, _) = encounters(&[
        begin_log(1),
        player_added(2, 1, "Kynes"),
        unit_added(3, 7, "HOSTILE", false, "Bystander"),
        unit_added(4, 8, "NPC_ALLY", false, "Guard"),
        unit_added(5, 9, "NEUTRAL", false, "Mudcrab"),
        begin_combat(100),
        combat_event(110, 10, 1, 8),
        unit_changed(120, 9, "HOSTILE", "Mudcrab"),
        combat_event(130, 10, 1, 9),
        end_combat(140),
        end_log(150),
    ]);

    assert_eq!(encounters.len(), 1);
    let names: Vec<_> = encounters[0]
        .hostile_units(&log)
        .map(|(_, unit)| unit.name.as_str())
        .collect();
    assert_eq!(names, vec!["Mudcrab"]);
}

#[test]
fn unit_is_not_hostile_after_changing_sides() {
    let (_, encounters, _) = encounters(&[
        begin_log(1),
        player_added(2, 1, "Kynes"),
        unit_added(3, 7, "HOSTILE", false, "Turncoat"),
        begin_combat(100),
        unit_changed(110, 7, "NPC_ALLY", "Turncoat"),
        combat_event(120, 10, 1, 7),
        end_combat(130),
        end_log(140),
    ]);
    assert!(encounters[0].hostile_units.is_empty());
}

#[test]
fn boss_names_the_encounter() {
    let (log, encounters, _) = encounters(&[
        begin_log(1),
        player_added(2, 1, "Kynes"),
        unit_added(3, 7, "HOSTILE", false, "Sulfur Flame Atronach"),
        unit_added(4, 8, "HOSTILE", true, "Oaxiltso"),
        begin_combat(100),
        combat_event(110, 10, 1, 7),
        combat_event_with_health(120, 10, 1, 8, 0),
        end_combat(130),
        end_log(140),
    ]);

    let encounter = &encounters[0];
    assert!(encounter.is_boss_encounter(&log));
    assert_eq!(encounter.display_name(&log), "Oaxiltso");
    assert!(encounter.was_killed(&log, 3));
    assert!(!encounter.was_killed(&log, 2));
}

#[test]
fn encounter_belongs_to_open_trial() {
    let (log, encounters, _) = encounters(&[
        begin_log(1),
        begin_trial(2, "15"),
        begin_combat(100),
        end_combat(200),
        end_trial(300, "15"),
        begin_combat(10_000),
        end_combat(10_100),
        end_log(10_200),
    ]);
    assert_eq!(encounters[0].trial_id(&log), Some(TrialId::Rockgrove));
    assert_eq!(encounters[1].trial_id(&log), None);
}

#[test]
fn segmenting_requires_resolution() {
    let (log, mut diagnostics) = build_log(&[begin_log(1), end_log(2)]);
    assert_eq!(
        segment(&log, &mut diagnostics),
        Err(ResolveError::NotResolved)
    );
}

fn uptime_log() -> Vec<String> {
    vec![
        begin_log(1),
        player_added(2, 1, "Kynes"),
        unit_added(3, 7, "HOSTILE", true, "Ogre"),
        begin_combat(1_000),
        combat_event(1_000, 10, 1, 7),
        effect_changed(2_000, "GAINED", 20, 1, 7),
        effect_changed(4_000, "FADED", 20, 1, 7),
        effect_changed(5_000, "FADED", 30, 1, 7),
        effect_changed(8_000, "GAINED", 20, 1, 7),
        combat_event(11_000, 10, 1, 7),
        end_combat(11_000),
        end_log(12_000),
    ]
}

#[test]
fn uptime_windows_pair_gained_and_faded() {
    let (log, encounters, _) = encounters(&uptime_log());
    let uptimes = encounter_uptimes(&log, &encounters[0]);
    assert_eq!(uptimes.len(), 1);

    let unit = &uptimes[0];
    assert_eq!(unit.unit, 2);
    assert_eq!(unit.active_span, EventSpan::new(4, 9));

    let ability_ids: Vec<_> = unit.effects.iter().map(|e| e.ability_id).collect();
    assert_eq!(ability_ids, vec![20, 30]);

    // Second window is still open and closes at the last hit.
    let renewed = &unit.effects[0];
    assert_eq!(
        renewed.windows,
        vec![EventSpan::new(5, 6), EventSpan::new(8, 9)]
    );
    assert!((renewed.uptime - 0.5).abs() < 1e-9);

    // Faded without gained opens at the first hit.
    let lingering = &unit.effects[1];
    assert_eq!(lingering.windows, vec![EventSpan::new(4, 7)]);
    assert!((lingering.uptime - 0.4).abs() < 1e-9);
}

#[test]
fn summary_serializes() {
    let (log, encounters, _) = encounters(&uptime_log());
    let summary = EncounterSummary::new(&log, &encounters[0]);
    assert_eq!(summary.display_name, "Ogre");
    assert_eq!(summary.duration_ms, Some(10_000));
    assert_eq!(summary.hostile_units.len(), 1);
    assert_eq!(summary.hostile_units[0].uptimes.len(), 2);
    assert!(!summary.hostile_units[0].was_killed);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["display_name"], "Ogre");
    assert_eq!(json["is_boss_encounter"], true);
    assert!(json.get("trial").is_none());
    let back: EncounterSummary = serde_json::from_value(json).unwrap();
    assert_eq!(back, summary);
}
