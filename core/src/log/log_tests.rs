use chrono::TimeDelta;

use super::*;
use crate::combat_log::TimeError;
use crate::diagnostics::Severity;
use crate::test_support::*;

fn make_log(lines: &[String]) -> Result<EncounterLog, LogError> {
    EncounterLog::from_events(parse_events(lines), &mut Diagnostics::new())
}

#[test]
fn sequence_ids_are_dense_positions() {
    let (log, _) = build_log(&[
        begin_log(1000),
        unit_added(1001, 7, "HOSTILE", false, "Ogre"),
        "junk".to_string(),
        end_log(1003),
    ]);
    for (index, event) in log.events().iter().enumerate() {
        assert_eq!(event.sequence_id, index);
    }
    assert_eq!(log.error_stub_count(), 1);
}

#[test]
fn singleton_violations_are_fatal() {
    assert_eq!(make_log(&[end_log(1)]).unwrap_err(), LogError::MissingBeginLog);
    assert_eq!(make_log(&[begin_log(1)]).unwrap_err(), LogError::MissingEndLog);
    assert_eq!(
        make_log(&[begin_log(1), begin_log(2), end_log(3)]).unwrap_err(),
        LogError::DuplicateBeginLog { first: 0, second: 1 }
    );
    assert_eq!(
        make_log(&[begin_log(1), end_log(2), end_log(3)]).unwrap_err(),
        LogError::DuplicateEndLog { first: 1, second: 2 }
    );
    assert_eq!(
        EncounterLog::from_events(Vec::new(), &mut Diagnostics::new()).unwrap_err(),
        LogError::EmptyLog
    );
}

#[test]
fn mismatched_sequence_ids_are_rejected() {
    let mut events = parse_events(&[begin_log(1), end_log(2)]);
    events[1].sequence_id = 5;
    assert_eq!(
        EncounterLog::from_events(events, &mut Diagnostics::new()).unwrap_err(),
        LogError::SequenceMismatch {
            index: 1,
            sequence_id: 5
        }
    );
}

#[test]
fn times_are_offsets_from_begin_log() {
    let (log, _) = build_log(&[
        begin_log(1000),
        begin_combat(1250),
        trial_init(1300, "15"),
        begin_trial(1400, "15"),
        end_combat(4000),
        end_log(4500),
    ]);
    let start = log.begin_time().unwrap();
    assert_eq!(log.events()[1].time().unwrap() - start, TimeDelta::milliseconds(250));
    assert_eq!(log.events()[4].time().unwrap() - start, TimeDelta::milliseconds(3000));
    assert_eq!(log.end_time().unwrap() - start, TimeDelta::milliseconds(3500));
    // Embedded timestamps are untouched
    assert!(log.events()[2].time().is_none());
    assert_eq!(
        log.events()[3].time().unwrap().and_utc().timestamp_millis(),
        BEGIN_EPOCH_MS + 1400
    );
}

#[test]
fn time_can_only_be_set_once() {
    let (mut log, _) = build_log(&[begin_log(1), end_log(2)]);
    let (events, _) = log.resolution_parts();
    let time = events[1].time().unwrap();
    assert_eq!(
        events[1].set_time(time),
        Err(TimeError::AlreadySet { sequence_id: 1 })
    );
}

#[test]
fn stubs_without_raw_id_stay_untimed() {
    let (log, diagnostics) = build_log(&[begin_log(1), "x,UNIT_REMOVED,1".into(), end_log(3)]);
    assert!(log.events()[1].time().is_none());
    assert_eq!(diagnostics.count(DiagnosticKind::RowConversion), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::TimeAssignment), 1);
}

#[test]
fn out_of_range_raw_id_is_left_untimed() {
    let (log, diagnostics) = build_log(&[
        begin_log(1),
        format!("{},BEGIN_COMBAT", i64::MIN),
        end_log(3),
    ]);
    assert!(log.events()[1].time().is_none());
    assert!(log.events()[2].time().is_some());
    let entry = diagnostics
        .of_kind(DiagnosticKind::TimeAssignment)
        .next()
        .unwrap();
    assert_eq!(entry.severity, Severity::Error);
    assert_eq!(entry.sequence_id, Some(1));
}

#[test]
fn navigation_and_spans() {
    let (log, _) = build_log(&[
        begin_log(1),
        begin_combat(2),
        end_combat(3),
        end_log(4),
    ]);
    assert!(log.previous(0).is_none());
    assert_eq!(log.previous(2).unwrap().sequence_id, 1);
    assert_eq!(log.next(2).unwrap().sequence_id, 3);
    assert!(log.next(3).is_none());

    assert_eq!(log.span(3, 1), Some(EventSpan::new(1, 3)));
    assert_eq!(log.span(1, 9), None);
    assert_eq!(log.span_to_end(0), Some(EventSpan::new(0, 3)));
    assert_eq!(log.full_span(), EventSpan::new(0, 3));
    assert_eq!(log.events_in(log.full_span()).len(), log.len());
    // Unresolved begin events span only themselves
    assert_eq!(log.span_to_end(1), Some(EventSpan::single(1)));

    let span = EventSpan::new(1, 2);
    let forward: Vec<_> = span.iter(&log).map(|e| e.sequence_id).collect();
    let backward: Vec<_> = span.iter(&log).rev().map(|e| e.sequence_id).collect();
    assert_eq!(forward, vec![1, 2]);
    assert_eq!(backward, vec![2, 1]);
    assert_eq!(span.duration(&log), Some(TimeDelta::milliseconds(1)));
    assert_eq!(log.of_type(EventType::BeginCombat).count(), 1);
}

#[test]
fn metadata_indices() {
    let (log, diagnostics) = build_log(&[
        begin_log(1),
        ability_info(2, 10, "Old Name"),
        ability_info(3, 10, "Crystal Fragments"),
        effect_info(4, 10, None),
        player_added(5, 1, "Kynes"),
        unit_added(6, 2, "HOSTILE", true, "Flame-Herald Bahsei"),
        end_log(7),
    ]);
    assert_eq!(log.ability_info(10).unwrap().name, "Crystal Fragments");
    assert!(log.effect_info(10).is_some());
    assert!(log.ability_info(11).is_none());
    assert_eq!(log.player_unit(1).unwrap().name, "Kynes");
    assert!(log.player_unit(2).is_none());
    assert_eq!(diagnostics.count(DiagnosticKind::DuplicateInfo), 1);
}
