//! Line builders for synthetic logs used across unit tests.

use crate::combat_log::{Event, TokenizerOptions, event_from_record, split_record};
use crate::diagnostics::Diagnostics;
use crate::log::EncounterLog;

pub const BEGIN_EPOCH_MS: i64 = 1_700_000_000_000;

pub fn state(unit_id: i64) -> String {
    state_with_health(unit_id, 20000)
}

pub fn state_with_health(unit_id: i64, health: i64) -> String {
    format!("{unit_id},{health}/20000,15000/15000,14000/14000,0/500,0/1000,0,0.5123,0.4876,1.2")
}

pub fn begin_log(raw: i64) -> String {
    format!(
        "{raw},BEGIN_LOG,{BEGIN_EPOCH_MS},15,\"NA Megaserver\",\"en\",\"eso.live.9.2.5.123456\""
    )
}

pub fn end_log(raw: i64) -> String {
    format!("{raw},END_LOG")
}

pub fn begin_combat(raw: i64) -> String {
    format!("{raw},BEGIN_COMBAT")
}

pub fn end_combat(raw: i64) -> String {
    format!("{raw},END_COMBAT")
}

pub fn begin_trial(raw: i64, trial: &str) -> String {
    format!("{raw},BEGIN_TRIAL,{trial},{}", BEGIN_EPOCH_MS + raw)
}

pub fn end_trial(raw: i64, trial: &str) -> String {
    format!("{raw},END_TRIAL,{trial},600000,T,120000,36")
}

pub fn trial_init(raw: i64, trial: &str) -> String {
    format!("{raw},TRIAL_INIT,{trial},T,F,5000,60000,F,0")
}

pub fn ability_info(raw: i64, ability_id: i64, name: &str) -> String {
    format!("{raw},ABILITY_INFO,{ability_id},\"{name}\",\"/esoui/art/icons/ability.dds\",T,T")
}

pub fn effect_info(raw: i64, ability_id: i64, synergy: Option<i64>) -> String {
    match synergy {
        Some(synergy) => format!("{raw},EFFECT_INFO,{ability_id},BUFF,NONE,DEFAULT,{synergy}"),
        None => format!("{raw},EFFECT_INFO,{ability_id},DEBUFF,NONE,DEFAULT"),
    }
}

pub fn unit_added(raw: i64, unit_id: i64, hostility: &str, is_boss: bool, name: &str) -> String {
    let boss = if is_boss { "T" } else { "F" };
    format!(
        "{raw},UNIT_ADDED,{unit_id},MONSTER,F,0,85000,{boss},0,0,\"{name}\",\"\",0,50,160,0,{hostility},F"
    )
}

pub fn player_added(raw: i64, unit_id: i64, name: &str) -> String {
    format!(
        "{raw},UNIT_ADDED,{unit_id},PLAYER,T,1,0,F,117,4,\"{name}\",\"@{name}\",4411,50,2100,0,PLAYER_ALLY,T"
    )
}

pub fn pet_added(raw: i64, unit_id: i64, owner_unit_id: i64) -> String {
    format!(
        "{raw},UNIT_ADDED,{unit_id},MONSTER,F,0,0,F,0,0,\"Twilight Matriarch\",\"\",0,50,160,{owner_unit_id},PLAYER_ALLY,F"
    )
}

pub fn unit_changed(raw: i64, unit_id: i64, hostility: &str, name: &str) -> String {
    format!("{raw},UNIT_CHANGED,{unit_id},0,0,\"{name}\",\"\",0,50,160,0,{hostility},F")
}

pub fn unit_removed(raw: i64, unit_id: i64) -> String {
    format!("{raw},UNIT_REMOVED,{unit_id}")
}

pub fn begin_cast(raw: i64, cast_id: i64, ability_id: i64, duration_ms: i64, source: i64) -> String {
    format!(
        "{raw},BEGIN_CAST,{duration_ms},F,{cast_id},{ability_id},{},*",
        state(source)
    )
}

pub fn end_cast(raw: i64, status: &str, cast_id: i64, ability_id: i64) -> String {
    format!("{raw},END_CAST,{status},{cast_id},{ability_id}")
}

pub fn combat_event(raw: i64, ability_id: i64, source: i64, target: i64) -> String {
    combat_event_with_health(raw, ability_id, source, target, 15000)
}

pub fn combat_event_with_health(
    raw: i64,
    ability_id: i64,
    source: i64,
    target: i64,
    target_health: i64,
) -> String {
    format!(
        "{raw},COMBAT_EVENT,DAMAGE,PHYSICAL,1,1234,0,{raw},{ability_id},{},{}",
        state(source),
        state_with_health(target, target_health)
    )
}

pub fn effect_changed(raw: i64, status: &str, ability_id: i64, source: i64, target: i64) -> String {
    format!(
        "{raw},EFFECT_CHANGED,{status},1,{raw},{ability_id},{},{}",
        state(source),
        state(target)
    )
}

/// Tokenize and convert lines, numbering them from zero.
pub fn parse_events(lines: &[String]) -> Vec<Event> {
    let options = TokenizerOptions::default();
    lines
        .iter()
        .enumerate()
        .map(|(seq, line)| event_from_record(seq, split_record(line, &options)))
        .collect()
}

pub fn build_log(lines: &[String]) -> (EncounterLog, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let log = EncounterLog::from_events(parse_events(lines), &mut diagnostics)
        .unwrap_or_else(|e| panic!("synthetic log failed to build: {e}"));
    (log, diagnostics)
}

/// Build and resolve a log.
pub fn resolved_log(lines: &[String]) -> (EncounterLog, Diagnostics) {
    let (mut log, mut diagnostics) = build_log(lines);
    log.resolve(&mut diagnostics)
        .unwrap_or_else(|e| panic!("resolution failed: {e}"));
    (log, diagnostics)
}
