//! End-to-end loading of on-disk logs.

use std::path::{Path, PathBuf};

use aegis_core::diagnostics::{DiagnosticKind, Diagnostics};
use aegis_core::loading::ParseMode;
use aegis_core::{
    CancellationToken, EventType, LoadError, LoadOptions, LogError, LogLoader, ParseWorkerOutput,
    segment,
};

const EPOCH_MS: i64 = 1_700_000_000_000;

fn state(unit_id: i64, health: i64) -> String {
    format!("{unit_id},{health}/20000,15000/15000,14000/14000,0/500,0/1000,0,0.5,0.5,1.0")
}

/// A log with a player, a few fights and some noise rows.
fn session(first_raw: i64, fights: i64) -> Vec<String> {
    let mut lines = vec![
        format!("{first_raw},BEGIN_LOG,{EPOCH_MS},15,\"EU Megaserver\",\"en\",\"eso.live.10.0.1\""),
        format!("{},ZONE_CHANGED,1427,\"Rockgrove\",VETERAN", first_raw + 1),
        format!(
            "{},UNIT_ADDED,1,PLAYER,T,1,0,F,117,4,\"Kynes\",\"@kynes\",4411,50,2100,0,PLAYER_ALLY,T",
            first_raw + 2
        ),
        format!("{},ABILITY_INFO,10,\"Cephaliarch's Flail\",\"/esoui/flail.dds\",F,T", first_raw + 3),
    ];
    let mut raw = first_raw + 10;
    for fight in 0..fights {
        let unit = 100 + fight;
        lines.push(format!(
            "{raw},UNIT_ADDED,{unit},MONSTER,F,0,9000,{},0,0,\"Ogre\",\"\",0,50,160,0,HOSTILE,F",
            if fight % 3 == 0 { "T" } else { "F" }
        ));
        lines.push(format!("{},BEGIN_COMBAT", raw + 1));
        lines.push(format!(
            "{},BEGIN_CAST,0,F,{},10,{},*",
            raw + 2,
            raw + 2,
            state(1, 20000)
        ));
        lines.push(format!("{},END_CAST,COMPLETED,{},10", raw + 3, raw + 2));
        lines.push(format!(
            "{},COMBAT_EVENT,DAMAGE,PHYSICAL,1,5000,0,{},10,{},{}",
            raw + 4,
            raw + 4,
            state(1, 20000),
            state(unit, 0)
        ));
        lines.push("garbage,,\"".to_string());
        lines.push(format!("{},END_COMBAT", raw + 5));
        lines.push(format!("{},UNIT_REMOVED,{unit}", raw + 6));
        raw += 10_000;
    }
    lines.push(format!("{raw},END_LOG"));
    lines
}

fn write_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\r\n") + "\r\n").unwrap();
    path
}

fn options() -> LoadOptions {
    LoadOptions {
        workers: 4,
        parallel_threshold_lines: 0,
        ..LoadOptions::default()
    }
}

#[test]
fn parallel_parsing_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 25));
    let loader = LogLoader::new(&path, options());

    let sequential = loader.read_sequential().unwrap();
    let line_count = sequential.len();
    assert_eq!(line_count, 4 + 25 * 8 + 1);

    for chunks in [1, 2, 7, line_count + 50] {
        let parallel = loader.read_parallel(chunks).unwrap();
        assert_eq!(parallel, sequential, "chunk count {chunks}");
    }
}

#[test]
fn sequence_ids_are_dense_after_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 10));

    for workers in [1, 3] {
        let loader = LogLoader::new(
            &path,
            LoadOptions {
                workers,
                chunks: 5,
                ..options()
            },
        );
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.logs.len(), 1);
        for (i, event) in loaded.logs[0].events().iter().enumerate() {
            assert_eq!(event.sequence_id, i);
        }
        if workers > 1 {
            assert_eq!(loaded.mode, ParseMode::Parallel { chunks: 5, workers: 3 });
        } else {
            assert_eq!(loaded.mode, ParseMode::Sequential);
        }
    }
}

#[test]
fn malformed_rows_become_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 3));
    let loaded = LogLoader::new(&path, options()).load().unwrap();

    let log = &loaded.logs[0];
    assert_eq!(log.error_stub_count(), 3);
    assert_eq!(loaded.diagnostics.count(DiagnosticKind::RowConversion), 3);
    assert_eq!(log.of_type(EventType::ErrorStub).count(), 3);
}

#[test]
fn multiple_logs_are_split_and_rebased() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = session(1, 2);
    lines.extend(session(500_000, 3));
    let path = write_file(dir.path(), "Encounter.log", &lines);

    let multiple = LogLoader::new(
        &path,
        LoadOptions {
            multiple_logs: true,
            ..options()
        },
    )
    .load()
    .unwrap();
    assert_eq!(multiple.logs.len(), 2);
    assert!(multiple.rejected.is_empty());
    assert_eq!(multiple.logs[1].begin_log_event().sequence_id, 0);
    assert_eq!(multiple.logs[1].len(), 4 + 3 * 8 + 1);

    let single = LogLoader::new(&path, options()).load().unwrap();
    assert_eq!(single.logs.len(), 1);
    assert_eq!(single.logs[0].len(), 4 + 2 * 8 + 1);
    assert_eq!(single.diagnostics.count(DiagnosticKind::TrailingEvents), 1);
}

#[test]
fn missing_end_log_rejects_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = session(1, 2);
    lines.pop();
    let path = write_file(dir.path(), "Encounter.log", &lines);

    let loaded = LogLoader::new(&path, options()).load().unwrap();
    assert!(loaded.logs.is_empty());
    assert_eq!(loaded.rejected.len(), 1);
    assert_eq!(loaded.rejected[0].error, LogError::MissingEndLog);

    let mut diagnostics = Diagnostics::new();
    let result = LogLoader::new(&path, options()).load_single(&mut diagnostics);
    assert!(matches!(result, Err(LoadError::Log(LogError::MissingEndLog))));
}

#[test]
fn missing_file_fails_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let loader = LogLoader::new(dir.path().join("nope.log"), options());
    assert!(matches!(loader.load(), Err(LoadError::Io { .. })));

    let loader = LogLoader::new(dir.path(), options());
    assert!(matches!(loader.load(), Err(LoadError::NotAFile { .. })));
}

#[test]
fn cancellation_aborts_parallel_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 10));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let loader = LogLoader::new(&path, options()).with_cancellation(cancel);
    assert!(matches!(
        loader.load(),
        Err(LoadError::Cancelled { .. })
    ));
}

#[test]
fn loaded_log_resolves_and_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 6));
    let mut loaded = LogLoader::new(&path, options()).load().unwrap();
    let log = &mut loaded.logs[0];
    let mut diagnostics = Diagnostics::new();

    let report = log.resolve(&mut diagnostics).unwrap();
    assert_eq!(report.casts.begin_casts, 6);
    assert_eq!(report.casts.unmatched_begins, 0);
    assert_eq!(report.units.units_removed, 6);
    assert_eq!(report.combats.matched, 6);
    assert_eq!(report.abilities.missing, 0);

    let encounters = segment(log, &mut diagnostics).unwrap();
    assert_eq!(encounters.len(), 6);
    assert!(encounters[0].is_boss_encounter(log));
    assert!(!encounters[1].is_boss_encounter(log));
    for encounter in &encounters {
        assert_eq!(encounter.hostile_units.len(), 1);
        assert!(encounter.was_killed(log, encounter.hostile_units[0]));
    }
}

#[test]
fn worker_output_serializes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Encounter.log", &session(1, 2));
    let loaded = LogLoader::new(&path, options()).load().unwrap();

    let output = ParseWorkerOutput::from_loaded(loaded, std::time::Instant::now());
    assert_eq!(output.logs.len(), 1);
    assert_eq!(output.logs[0].encounters.len(), 2);
    assert_eq!(output.logs[0].error_stub_count, 2);
    assert_eq!(output.logs[0].players[0].name, "Kynes");

    let json = serde_json::to_string(&output).unwrap();
    let back: ParseWorkerOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(back, output);
}
