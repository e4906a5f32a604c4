//! Typed events of an encounter log.
//!
//! Events live in their log's arena (a `Vec<Event>`). Relationships between
//! events are stored as sequence ids into that arena and are filled in by the
//! resolution passes, never by the factory.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use super::enums::{
    CastStatus, ClassId, CombatResultType, DamageType, EffectChangedStatus, EffectType, Hostility,
    Locale, NoEffectBar, RaceId, ResourceType, Server, StatusEffectType, TrialId, UnitType,
    ZoneDifficulty,
};
use super::error::{FactoryError, TimeError};
use super::fields::Resource;

/// Position of an event in its owning log.
pub type SequenceId = usize;

/// Ability id of combat events that carry no ability.
pub const NO_ABILITY_ID: i64 = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub sequence_id: SequenceId,
    /// Millisecond-offset id from the source line. `None` only for error stubs
    /// whose id could not be read.
    pub raw_event_id: Option<i64>,
    time: Option<NaiveDateTime>,
    /// Trailing fields not covered by the variant's layout.
    pub data: Vec<String>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(sequence_id: SequenceId, raw_event_id: Option<i64>, kind: EventKind) -> Self {
        Self {
            sequence_id,
            raw_event_id,
            time: None,
            data: Vec::new(),
            kind,
        }
    }

    pub fn with_data(mut self, data: Vec<String>) -> Self {
        self.data = data;
        self
    }

    /// Time read from the event's own fields at construction.
    pub(crate) fn with_embedded_time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn time(&self) -> Option<NaiveDateTime> {
        self.time
    }

    /// Assign the event's wall-clock time. Time may only be set once.
    pub fn set_time(&mut self, time: NaiveDateTime) -> Result<(), TimeError> {
        if self.time.is_some() {
            return Err(TimeError::AlreadySet {
                sequence_id: self.sequence_id,
            });
        }
        self.time = Some(time);
        Ok(())
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn tag(&self) -> &'static str {
        self.event_type().tag()
    }

    pub fn is_error_stub(&self) -> bool {
        matches!(self.kind, EventKind::ErrorStub(_))
    }

    /// Ability id for the kinds that carry one.
    pub fn ability_id(&self) -> Option<i64> {
        match &self.kind {
            EventKind::AbilityInfo(e) => Some(e.ability_id),
            EventKind::EffectInfo(e) => Some(e.ability_id),
            EventKind::BeginCast(e) => Some(e.targeting.ability_id),
            EventKind::EndCast(e) => Some(e.ability_id),
            EventKind::EffectChanged(e) => Some(e.targeting.ability_id),
            EventKind::CombatEvent(e) | EventKind::SoulGemResurrectionAccepted(e) => {
                Some(e.targeting.ability_id)
            }
            _ => None,
        }
    }

    /// Source/target information of targeted events.
    pub fn targeting(&self) -> Option<&Targeting> {
        match &self.kind {
            EventKind::BeginCast(e) => Some(&e.targeting),
            EventKind::EffectChanged(e) => Some(&e.targeting),
            EventKind::CombatEvent(e) | EventKind::SoulGemResurrectionAccepted(e) => {
                Some(&e.targeting)
            }
            _ => None,
        }
    }

    pub fn targeting_mut(&mut self) -> Option<&mut Targeting> {
        match &mut self.kind {
            EventKind::BeginCast(e) => Some(&mut e.targeting),
            EventKind::EffectChanged(e) => Some(&mut e.targeting),
            EventKind::CombatEvent(e) | EventKind::SoulGemResurrectionAccepted(e) => {
                Some(&mut e.targeting)
            }
            _ => None,
        }
    }

    /// Kinds whose time comes from their own fields rather than the offset pass.
    pub fn carries_own_time(&self) -> bool {
        matches!(
            self.kind,
            EventKind::BeginLog(_) | EventKind::BeginTrial(_) | EventKind::TrialInit(_)
        )
    }
}

macro_rules! variant_accessors {
    ($($variant:ident => $ty:ty, $as_ref:ident, $as_mut:ident;)+) => {
        impl Event {
            $(
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match &self.kind {
                        EventKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match &mut self.kind {
                        EventKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )+
        }
    };
}

variant_accessors! {
    BeginLog => BeginLog, as_begin_log, as_begin_log_mut;
    BeginCombat => BeginCombat, as_begin_combat, as_begin_combat_mut;
    EndCombat => EndCombat, as_end_combat, as_end_combat_mut;
    BeginTrial => BeginTrial, as_begin_trial, as_begin_trial_mut;
    EndTrial => EndTrial, as_end_trial, as_end_trial_mut;
    TrialInit => TrialInit, as_trial_init, as_trial_init_mut;
    AbilityInfo => AbilityInfo, as_ability_info, as_ability_info_mut;
    EffectInfo => EffectInfo, as_effect_info, as_effect_info_mut;
    UnitAdded => UnitAdded, as_unit_added, as_unit_added_mut;
    UnitChanged => UnitChanged, as_unit_changed, as_unit_changed_mut;
    UnitRemoved => UnitRemoved, as_unit_removed, as_unit_removed_mut;
    BeginCast => BeginCast, as_begin_cast, as_begin_cast_mut;
    EndCast => EndCast, as_end_cast, as_end_cast_mut;
    EffectChanged => EffectChanged, as_effect_changed, as_effect_changed_mut;
    CombatEvent => CombatEvent, as_combat_event, as_combat_event_mut;
    HealthRegen => HealthRegen, as_health_regen, as_health_regen_mut;
    PlayerInfo => PlayerInfo, as_player_info, as_player_info_mut;
    ZoneChanged => ZoneChanged, as_zone_changed, as_zone_changed_mut;
    MapChanged => MapChanged, as_map_changed, as_map_changed_mut;
    ErrorStub => ErrorStub, as_error_stub, as_error_stub_mut;
}

// ─────────────────────────────────────────────────────────────────────────────
// Variants
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    BeginLog(BeginLog),
    EndLog,
    BeginCombat(BeginCombat),
    EndCombat(EndCombat),
    BeginTrial(BeginTrial),
    EndTrial(EndTrial),
    TrialInit(TrialInit),
    AbilityInfo(AbilityInfo),
    EffectInfo(EffectInfo),
    UnitAdded(UnitAdded),
    UnitChanged(UnitChanged),
    UnitRemoved(UnitRemoved),
    BeginCast(BeginCast),
    EndCast(EndCast),
    EffectChanged(EffectChanged),
    CombatEvent(CombatEvent),
    /// A combat event without an ability: a player accepted a soul gem resurrection.
    SoulGemResurrectionAccepted(CombatEvent),
    HealthRegen(HealthRegen),
    PlayerInfo(PlayerInfo),
    ZoneChanged(ZoneChanged),
    MapChanged(MapChanged),
    /// A row that could not be turned into a typed event.
    ErrorStub(ErrorStub),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::BeginLog(_) => EventType::BeginLog,
            Self::EndLog => EventType::EndLog,
            Self::BeginCombat(_) => EventType::BeginCombat,
            Self::EndCombat(_) => EventType::EndCombat,
            Self::BeginTrial(_) => EventType::BeginTrial,
            Self::EndTrial(_) => EventType::EndTrial,
            Self::TrialInit(_) => EventType::TrialInit,
            Self::AbilityInfo(_) => EventType::AbilityInfo,
            Self::EffectInfo(_) => EventType::EffectInfo,
            Self::UnitAdded(_) => EventType::UnitAdded,
            Self::UnitChanged(_) => EventType::UnitChanged,
            Self::UnitRemoved(_) => EventType::UnitRemoved,
            Self::BeginCast(_) => EventType::BeginCast,
            Self::EndCast(_) => EventType::EndCast,
            Self::EffectChanged(_) => EventType::EffectChanged,
            Self::CombatEvent(_) => EventType::CombatEvent,
            Self::SoulGemResurrectionAccepted(_) => EventType::SoulGemResurrectionAccepted,
            Self::HealthRegen(_) => EventType::HealthRegen,
            Self::PlayerInfo(_) => EventType::PlayerInfo,
            Self::ZoneChanged(_) => EventType::ZoneChanged,
            Self::MapChanged(_) => EventType::MapChanged,
            Self::ErrorStub(_) => EventType::ErrorStub,
        }
    }
}

/// Field-less discriminant of [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    BeginLog,
    EndLog,
    BeginCombat,
    EndCombat,
    BeginTrial,
    EndTrial,
    TrialInit,
    AbilityInfo,
    EffectInfo,
    UnitAdded,
    UnitChanged,
    UnitRemoved,
    BeginCast,
    EndCast,
    EffectChanged,
    CombatEvent,
    SoulGemResurrectionAccepted,
    HealthRegen,
    PlayerInfo,
    ZoneChanged,
    MapChanged,
    ErrorStub,
}

impl EventType {
    /// Type tag as written in the log.
    pub fn tag(self) -> &'static str {
        match self {
            Self::BeginLog => "BEGIN_LOG",
            Self::EndLog => "END_LOG",
            Self::BeginCombat => "BEGIN_COMBAT",
            Self::EndCombat => "END_COMBAT",
            Self::BeginTrial => "BEGIN_TRIAL",
            Self::EndTrial => "END_TRIAL",
            Self::TrialInit => "TRIAL_INIT",
            Self::AbilityInfo => "ABILITY_INFO",
            Self::EffectInfo => "EFFECT_INFO",
            Self::UnitAdded => "UNIT_ADDED",
            Self::UnitChanged => "UNIT_CHANGED",
            Self::UnitRemoved => "UNIT_REMOVED",
            Self::BeginCast => "BEGIN_CAST",
            Self::EndCast => "END_CAST",
            Self::EffectChanged => "EFFECT_CHANGED",
            Self::CombatEvent | Self::SoulGemResurrectionAccepted => "COMBAT_EVENT",
            Self::HealthRegen => "HEALTH_REGEN",
            Self::PlayerInfo => "PLAYER_INFO",
            Self::ZoneChanged => "ZONE_CHANGED",
            Self::MapChanged => "MAP_CHANGED",
            Self::ErrorStub => "ERROR_STUB",
        }
    }
}

// ─── Log and span boundaries ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BeginLog {
    pub log_version: i64,
    pub server: Server,
    pub locale: Locale,
    pub client_version: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeginCombat {
    pub end_combat: Option<SequenceId>,
    /// Trial that was open when this combat began.
    pub begin_trial: Option<SequenceId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndCombat {
    pub begin_combat: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeginTrial {
    pub trial_id: TrialId,
    pub end_trial: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndTrial {
    pub trial_id: TrialId,
    pub duration: TimeDelta,
    pub success: bool,
    pub final_score: i64,
    pub final_vitality_bonus: i64,
    pub begin_trial: Option<SequenceId>,
}

/// Trial state recorded when logging starts inside a running trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialInit {
    pub trial_id: TrialId,
    pub in_progress: bool,
    pub completed: bool,
    pub start_time: TimeDelta,
    pub duration: TimeDelta,
    pub success: bool,
    pub final_score: i64,
}

// ─── Metadata ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AbilityInfo {
    pub ability_id: i64,
    pub name: String,
    pub icon_path: String,
    pub interruptible: bool,
    pub blockable: bool,
    pub effect_info: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectInfo {
    pub ability_id: i64,
    pub effect_type: EffectType,
    pub status_effect_type: StatusEffectType,
    pub no_effect_bar: NoEffectBar,
    pub grants_synergy_ability_id: Option<i64>,
    pub ability_info: Option<SequenceId>,
    pub synergy_ability_info: Option<SequenceId>,
}

// ─── Units ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct UnitAdded {
    pub unit_id: i64,
    pub unit_type: UnitType,
    pub is_local_player: bool,
    pub player_per_session_id: i64,
    pub monster_id: i64,
    pub is_boss: bool,
    pub class_id: ClassId,
    pub race_id: RaceId,
    pub name: String,
    pub account: String,
    pub character_id: i64,
    pub level: i64,
    pub champion_level: i64,
    pub owner_unit_id: i64,
    pub hostility: Hostility,
    pub is_grouped_with_local_player: bool,
    pub unit_changed: Vec<SequenceId>,
    pub unit_removed: Option<SequenceId>,
    pub owner_unit: Option<SequenceId>,
}

impl UnitAdded {
    pub fn is_player(&self) -> bool {
        self.unit_type == UnitType::Player
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitChanged {
    pub unit_id: i64,
    pub class_id: ClassId,
    pub race_id: RaceId,
    pub name: String,
    pub account: String,
    pub character_id: i64,
    pub level: i64,
    pub champion_level: i64,
    pub owner_unit_id: i64,
    pub hostility: Hostility,
    pub is_grouped_with_local_player: bool,
    pub unit_added: Option<SequenceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitRemoved {
    pub unit_id: i64,
    pub unit_added: Option<SequenceId>,
}

/// Snapshot of a unit's resources and position.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitState {
    pub unit_id: i64,
    pub health: Resource,
    pub magicka: Resource,
    pub stamina: Resource,
    pub ultimate: Resource,
    pub werewolf_ultimate: String,
    pub shield: String,
    pub x: String,
    pub y: String,
    pub heading: String,
}

/// Source and optional target of an ability-driven event.
#[derive(Debug, Clone, PartialEq)]
pub struct Targeting {
    pub ability_id: i64,
    pub source: UnitState,
    /// `None` when the log wrote the `*` wildcard.
    pub target: Option<UnitState>,
    pub unit: Option<SequenceId>,
    pub target_unit: Option<SequenceId>,
    pub ability_info: Option<SequenceId>,
}

impl Targeting {
    pub fn unit_id(&self) -> i64 {
        self.source.unit_id
    }

    pub fn target_unit_id(&self) -> Option<i64> {
        self.target.as_ref().map(|t| t.unit_id)
    }
}

// ─── Casts, effects and combat ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BeginCast {
    pub duration: TimeDelta,
    pub channeled: bool,
    pub cast_effect_id: i64,
    pub targeting: Targeting,
    pub end_cast: Option<SequenceId>,
    /// End casts with a different ability id attached through the orphan rule.
    pub orphaned_end_casts: Vec<SequenceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndCast {
    pub status: CastStatus,
    pub cast_effect_id: i64,
    pub ability_id: i64,
    pub interrupting_ability_id: Option<i64>,
    pub interrupting_unit_id: Option<i64>,
    /// Sorted ascending.
    pub begin_casts: Vec<SequenceId>,
    pub ability_info: Option<SequenceId>,
}

impl EndCast {
    /// The most recent begin cast resolved by this end cast.
    pub fn begin_cast(&self) -> Option<SequenceId> {
        self.begin_casts.iter().copied().max()
    }

    pub fn completed(&self) -> bool {
        self.status == CastStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectChanged {
    pub status: EffectChangedStatus,
    pub stack_count: i64,
    pub cast_effect_id: i64,
    pub targeting: Targeting,
    pub player_initiated_remove_cast_track_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatEvent {
    pub result_type: CombatResultType,
    pub damage_type: DamageType,
    pub resource_type: ResourceType,
    pub hit_value: i64,
    pub overflow: i64,
    pub cast_effect_id: i64,
    pub targeting: Targeting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthRegen {
    pub effective_regen: i64,
    pub state: UnitState,
    pub unit: Option<SequenceId>,
}

// ─── Player and world ───────────────────────────────────────────────────────

/// One equipped item: slot, id, champion flag, level, trait, quality, set and
/// enchantment fields in log order.
#[derive(Debug, Clone, PartialEq)]
pub struct GearPiece {
    pub fields: Vec<String>,
}

impl GearPiece {
    pub fn slot(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }

    pub fn item_id(&self) -> Option<i64> {
        self.fields.get(1).and_then(|id| id.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub unit_id: i64,
    pub passives: Vec<i64>,
    pub passive_stacks: Vec<i64>,
    pub gear: Vec<GearPiece>,
    pub front_bar: Vec<i64>,
    pub back_bar: Vec<i64>,
    pub unit: Option<SequenceId>,
    pub passive_infos: Vec<SequenceId>,
    pub front_bar_infos: Vec<SequenceId>,
    pub back_bar_infos: Vec<SequenceId>,
}

impl PlayerInfo {
    pub fn passives_active(&self) -> impl Iterator<Item = bool> + '_ {
        self.passive_stacks.iter().map(|&stacks| stacks != 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneChanged {
    pub zone_id: i64,
    pub zone_name: String,
    pub difficulty: ZoneDifficulty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapChanged {
    pub map_id: i64,
    pub map_name: String,
    pub texture_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorStub {
    /// Tag of the row, when one could be read.
    pub tag: Option<String>,
    pub error: FactoryError,
}
