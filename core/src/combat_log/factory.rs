//! Event factory: tag + raw fields to typed event.
//!
//! The tag registry is a compile-time `phf` table. Conversion failures never
//! escape [`event_from_record`]; they become [`ErrorStub`] events holding the
//! error so that sequence ids stay dense.

use phf::phf_map;

use super::event::{
    AbilityInfo, BeginCast, BeginCombat, BeginLog, BeginTrial, CombatEvent, EffectChanged,
    EffectInfo, EndCast, EndCombat, EndTrial, ErrorStub, Event, EventKind, EventType, GearPiece,
    HealthRegen, MapChanged, NO_ABILITY_ID, PlayerInfo, SequenceId, Targeting, TrialInit,
    UnitAdded, UnitChanged, UnitRemoved, UnitState, ZoneChanged,
};
use super::error::{FactoryError, FieldError, RecordError};
use super::fields::{FieldCursor, bracket_groups, int_items, nested_items};
use super::tokenizer::Fields;

/// Target field value meaning "no target".
pub const NO_TARGET: &str = "*";

static EVENT_TYPES: phf::Map<&'static str, EventType> = phf_map! {
    "BEGIN_LOG" => EventType::BeginLog,
    "END_LOG" => EventType::EndLog,
    "BEGIN_COMBAT" => EventType::BeginCombat,
    "END_COMBAT" => EventType::EndCombat,
    "BEGIN_TRIAL" => EventType::BeginTrial,
    "END_TRIAL" => EventType::EndTrial,
    "TRIAL_INIT" => EventType::TrialInit,
    "ABILITY_INFO" => EventType::AbilityInfo,
    "EFFECT_INFO" => EventType::EffectInfo,
    "UNIT_ADDED" => EventType::UnitAdded,
    "UNIT_CHANGED" => EventType::UnitChanged,
    "UNIT_REMOVED" => EventType::UnitRemoved,
    "BEGIN_CAST" => EventType::BeginCast,
    "END_CAST" => EventType::EndCast,
    "EFFECT_CHANGED" => EventType::EffectChanged,
    "COMBAT_EVENT" => EventType::CombatEvent,
    "HEALTH_REGEN" => EventType::HealthRegen,
    "PLAYER_INFO" => EventType::PlayerInfo,
    "ZONE_CHANGED" => EventType::ZoneChanged,
    "MAP_CHANGED" => EventType::MapChanged,
};

/// Look up the event type registered for a tag.
pub fn event_type_for_tag(tag: &str) -> Option<EventType> {
    EVENT_TYPES.get(tag).copied()
}

/// Every registered tag.
pub fn registered_tags() -> impl Iterator<Item = &'static str> {
    EVENT_TYPES.keys().copied()
}

/// Build a typed event from a tag and the fields following it.
pub fn create(
    sequence_id: SequenceId,
    raw_event_id: i64,
    tag: &str,
    fields: &[Option<String>],
) -> Result<Event, FactoryError> {
    let event_type =
        event_type_for_tag(tag).ok_or_else(|| FactoryError::UnrecognizedType(tag.to_string()))?;
    let field_error = |source: FieldError| FactoryError::Field {
        tag: event_type.tag(),
        source,
    };

    let mut cursor = FieldCursor::new(fields);
    let (kind, time) = build_kind(event_type, &mut cursor).map_err(field_error)?;
    let event = Event::new(sequence_id, Some(raw_event_id), kind).with_data(cursor.into_rest());
    Ok(match time {
        Some(time) => event.with_embedded_time(time),
        None => event,
    })
}

/// Turn a tokenized row into an event, producing an error stub on any failure.
pub fn event_from_record(
    sequence_id: SequenceId,
    record: Result<Fields, RecordError>,
) -> Event {
    let fields = match record {
        Ok(fields) => fields,
        Err(e) => return stub(sequence_id, None, None, e.into(), Vec::new()),
    };

    let raw_id = fields.first().and_then(|f| f.as_deref());
    let tag = fields.get(1).and_then(|f| f.as_deref());
    let raw_event_id = raw_id.and_then(|id| id.trim().parse::<i64>().ok());

    let outcome = match (fields.is_empty(), raw_id, raw_event_id, tag) {
        (true, ..) => Err(FactoryError::EmptyRecord),
        (_, None, ..) => Err(FactoryError::MissingEventId),
        (_, Some(id), None, _) => Err(FactoryError::InvalidEventId(id.to_string())),
        (_, _, Some(_), None) => Err(FactoryError::MissingTag),
        (_, _, Some(id), Some(tag)) => create(sequence_id, id, tag, fields.get(2..).unwrap_or(&[])),
    };

    match outcome {
        Ok(event) => event,
        Err(error) => {
            let data = fields.iter().map(|f| f.clone().unwrap_or_default()).collect();
            stub(sequence_id, raw_event_id, tag.map(str::to_string), error, data)
        }
    }
}

fn stub(
    sequence_id: SequenceId,
    raw_event_id: Option<i64>,
    tag: Option<String>,
    error: FactoryError,
    data: Vec<String>,
) -> Event {
    tracing::debug!(sequence_id, error = %error, "Row converted to error stub");
    Event::new(
        sequence_id,
        raw_event_id,
        EventKind::ErrorStub(ErrorStub { tag, error }),
    )
    .with_data(data)
}

// ─────────────────────────────────────────────────────────────────────────────
// Constructors
// ─────────────────────────────────────────────────────────────────────────────

type Built = (EventKind, Option<chrono::NaiveDateTime>);

fn build_kind(event_type: EventType, c: &mut FieldCursor<'_>) -> Result<Built, FieldError> {
    let kind = match event_type {
        EventType::BeginLog => {
            let time = c.epoch_millis("time")?;
            let kind = EventKind::BeginLog(BeginLog {
                log_version: c.int("log_version")?,
                server: c.enumeration("server")?,
                locale: c.enumeration("locale")?,
                client_version: c.text("client_version")?,
            });
            return Ok((kind, Some(time)));
        }
        EventType::BeginTrial => {
            let trial_id = c.enumeration("trial_id")?;
            let time = c.epoch_millis("time")?;
            let kind = EventKind::BeginTrial(BeginTrial {
                trial_id,
                end_trial: None,
            });
            return Ok((kind, Some(time)));
        }
        EventType::EndLog => EventKind::EndLog,
        EventType::BeginCombat => EventKind::BeginCombat(BeginCombat::default()),
        EventType::EndCombat => EventKind::EndCombat(EndCombat::default()),
        EventType::EndTrial => EventKind::EndTrial(EndTrial {
            trial_id: c.enumeration("trial_id")?,
            duration: c.millis("duration")?,
            success: c.flag("success")?,
            final_score: c.int("final_score")?,
            final_vitality_bonus: c.int("final_vitality_bonus")?,
            begin_trial: None,
        }),
        EventType::TrialInit => EventKind::TrialInit(TrialInit {
            trial_id: c.enumeration("trial_id")?,
            in_progress: c.flag("in_progress")?,
            completed: c.flag("completed")?,
            start_time: c.millis("start_time")?,
            duration: c.millis("duration")?,
            success: c.flag("success")?,
            final_score: c.int("final_score")?,
        }),
        EventType::AbilityInfo => EventKind::AbilityInfo(AbilityInfo {
            ability_id: c.int("ability_id")?,
            name: c.text("name")?,
            icon_path: c.text("icon_path")?,
            interruptible: c.flag("interruptible")?,
            blockable: c.flag("blockable")?,
            effect_info: None,
        }),
        EventType::EffectInfo => EventKind::EffectInfo(EffectInfo {
            ability_id: c.int("ability_id")?,
            effect_type: c.enumeration("effect_type")?,
            status_effect_type: c.enumeration("status_effect_type")?,
            no_effect_bar: c.enumeration("no_effect_bar")?,
            grants_synergy_ability_id: c.opt_int("grants_synergy_ability_id")?,
            ability_info: None,
            synergy_ability_info: None,
        }),
        EventType::UnitAdded => EventKind::UnitAdded(UnitAdded {
            unit_id: c.int("unit_id")?,
            unit_type: c.enumeration("unit_type")?,
            is_local_player: c.flag("is_local_player")?,
            player_per_session_id: c.int("player_per_session_id")?,
            monster_id: c.int("monster_id")?,
            is_boss: c.flag("is_boss")?,
            class_id: c.enumeration("class_id")?,
            race_id: c.enumeration("race_id")?,
            name: c.text("name")?,
            account: c.text("account")?,
            character_id: c.int("character_id")?,
            level: c.int("level")?,
            champion_level: c.int("champion_level")?,
            owner_unit_id: c.int("owner_unit_id")?,
            hostility: c.enumeration("hostility")?,
            is_grouped_with_local_player: c.flag("is_grouped_with_local_player")?,
            unit_changed: Vec::new(),
            unit_removed: None,
            owner_unit: None,
        }),
        EventType::UnitChanged => EventKind::UnitChanged(UnitChanged {
            unit_id: c.int("unit_id")?,
            class_id: c.enumeration("class_id")?,
            race_id: c.enumeration("race_id")?,
            name: c.text("name")?,
            account: c.text("account")?,
            character_id: c.int("character_id")?,
            level: c.int("level")?,
            champion_level: c.int("champion_level")?,
            owner_unit_id: c.int("owner_unit_id")?,
            hostility: c.enumeration("hostility")?,
            is_grouped_with_local_player: c.flag("is_grouped_with_local_player")?,
            unit_added: None,
        }),
        EventType::UnitRemoved => EventKind::UnitRemoved(UnitRemoved {
            unit_id: c.int("unit_id")?,
            unit_added: None,
        }),
        EventType::BeginCast => {
            let duration = c.millis("duration")?;
            let channeled = c.flag("channeled")?;
            let cast_effect_id = c.int("cast_effect_id")?;
            EventKind::BeginCast(BeginCast {
                duration,
                channeled,
                cast_effect_id,
                targeting: targeting(c)?,
                end_cast: None,
                orphaned_end_casts: Vec::new(),
            })
        }
        EventType::EndCast => EventKind::EndCast(EndCast {
            status: c.enumeration("status")?,
            cast_effect_id: c.int("cast_effect_id")?,
            ability_id: c.int("ability_id")?,
            interrupting_ability_id: c.opt_int("interrupting_ability_id")?,
            interrupting_unit_id: c.opt_int("interrupting_unit_id")?,
            begin_casts: Vec::new(),
            ability_info: None,
        }),
        EventType::EffectChanged => {
            let status = c.enumeration("status")?;
            let stack_count = c.int("stack_count")?;
            let cast_effect_id = c.int("cast_effect_id")?;
            EventKind::EffectChanged(EffectChanged {
                status,
                stack_count,
                cast_effect_id,
                targeting: targeting(c)?,
                player_initiated_remove_cast_track_id: c.opt_text(),
            })
        }
        EventType::CombatEvent | EventType::SoulGemResurrectionAccepted => {
            let combat = CombatEvent {
                result_type: c.enumeration("result_type")?,
                damage_type: c.enumeration("damage_type")?,
                resource_type: c.enumeration("resource_type")?,
                hit_value: c.int("hit_value")?,
                overflow: c.int("overflow")?,
                cast_effect_id: c.int("cast_effect_id")?,
                targeting: targeting(c)?,
            };
            if combat.targeting.ability_id == NO_ABILITY_ID {
                EventKind::SoulGemResurrectionAccepted(combat)
            } else {
                EventKind::CombatEvent(combat)
            }
        }
        EventType::HealthRegen => EventKind::HealthRegen(HealthRegen {
            effective_regen: c.int("effective_regen")?,
            state: unit_state(c, None)?,
            unit: None,
        }),
        EventType::PlayerInfo => EventKind::PlayerInfo(player_info(c)?),
        EventType::ZoneChanged => EventKind::ZoneChanged(ZoneChanged {
            zone_id: c.int("zone_id")?,
            zone_name: c.text("zone_name")?,
            difficulty: c.enumeration("difficulty")?,
        }),
        EventType::MapChanged => EventKind::MapChanged(MapChanged {
            map_id: c.int("map_id")?,
            map_name: c.text("map_name")?,
            texture_path: c.text("texture_path")?,
        }),
        EventType::ErrorStub => return Err(FieldError::Missing("tag")),
    };
    Ok((kind, None))
}

/// Ability id, source state block and target block (`*` or a state block).
fn targeting(c: &mut FieldCursor<'_>) -> Result<Targeting, FieldError> {
    let ability_id = c.int("ability_id")?;
    let source = unit_state(c, None)?;
    let target = match c.peek() {
        Some(NO_TARGET) => {
            c.opt_text();
            None
        }
        _ => {
            let unit_id = c.int("target_unit_id")?;
            Some(unit_state(c, Some(unit_id))?)
        }
    };
    Ok(Targeting {
        ability_id,
        source,
        target,
        unit: None,
        target_unit: None,
        ability_info: None,
    })
}

fn unit_state(c: &mut FieldCursor<'_>, unit_id: Option<i64>) -> Result<UnitState, FieldError> {
    let unit_id = match unit_id {
        Some(id) => id,
        None => c.int("unit_id")?,
    };
    Ok(UnitState {
        unit_id,
        health: c.resource("health")?,
        magicka: c.resource("magicka")?,
        stamina: c.resource("stamina")?,
        ultimate: c.resource("ultimate")?,
        werewolf_ultimate: c.text("werewolf_ultimate")?,
        shield: c.text("shield")?,
        x: c.text("x")?,
        y: c.text("y")?,
        heading: c.text("heading")?,
    })
}

fn player_info(c: &mut FieldCursor<'_>) -> Result<PlayerInfo, FieldError> {
    let unit_id = c.int("unit_id")?;
    let joined = c.join_rest();
    let groups = bracket_groups(&joined, "player_info")?;
    let group = |index: usize, name: &'static str| -> Result<&str, FieldError> {
        groups.get(index).copied().ok_or(FieldError::Missing(name))
    };
    Ok(PlayerInfo {
        unit_id,
        passives: int_items(group(0, "passives")?, "passives")?,
        passive_stacks: int_items(group(1, "passive_stacks")?, "passive_stacks")?,
        gear: nested_items(group(2, "gear")?, "gear")?
            .into_iter()
            .map(|fields| GearPiece { fields })
            .collect(),
        front_bar: int_items(group(3, "front_bar")?, "front_bar")?,
        back_bar: int_items(group(4, "back_bar")?, "back_bar")?,
        unit: None,
        passive_infos: Vec::new(),
        front_bar_infos: Vec::new(),
        back_bar_infos: Vec::new(),
    })
}
