//! Enumerated field values of the encounter log.
//!
//! Every enumeration fails loudly on values it does not know. A new game patch
//! that introduces a value turns the affected rows into error stubs instead of
//! silently coercing them.

use serde::{Deserialize, Serialize};

/// Lookup of an enumeration from its on-disk code.
pub trait LogEnum: Sized + Copy {
    /// Human-readable enumeration name used in error messages.
    const KIND: &'static str;

    fn from_code(code: &str) -> Option<Self>;
    fn code(self) -> &'static str;
}

macro_rules! log_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl LogEnum for $name {
            const KIND: &'static str = stringify!($name);

            fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

log_enum!(EffectType {
    Buff => "BUFF",
    Debuff => "DEBUFF",
});

log_enum!(StatusEffectType {
    None => "NONE",
    Bleed => "BLEED",
    Magic => "MAGIC",
    Poison => "POISON",
    Root => "ROOT",
    Snare => "SNARE",
});

log_enum!(NoEffectBar {
    Never => "NEVER",
    Default => "DEFAULT",
});

log_enum!(Server {
    Eu => "EU Megaserver",
    Na => "NA Megaserver",
    Pts => "PTS",
});

log_enum!(Locale {
    En => "en",
    De => "de",
    Fr => "fr",
    Es => "es",
    Ru => "ru",
    Jp => "jp",
});

log_enum!(
    /// Trials that the recorder knows about.
    TrialId {
        AsylumSanctorium => "8",
        Cloudrest => "9",
        Rockgrove => "15",
    }
);

log_enum!(ZoneDifficulty {
    None => "NONE",
    Normal => "NORMAL",
    Veteran => "VETERAN",
});

log_enum!(Hostility {
    Hostile => "HOSTILE",
    NpcAlly => "NPC_ALLY",
    PlayerAlly => "PLAYER_ALLY",
    Friendly => "FRIENDLY",
    Neutral => "NEUTRAL",
});

log_enum!(UnitType {
    Monster => "MONSTER",
    Object => "OBJECT",
    Player => "PLAYER",
});

log_enum!(ClassId {
    Invalid => "0",
    Dragonknight => "1",
    Sorcerer => "2",
    Nightblade => "3",
    Warden => "4",
    Necromancer => "5",
    Templar => "6",
    Arcanist => "117",
});

log_enum!(RaceId {
    Invalid => "0",
    Breton => "1",
    Redguard => "2",
    Orc => "3",
    Dunmer => "4",
    Nord => "5",
    Argonian => "6",
    Altmer => "7",
    Bosmer => "8",
    Khajiit => "9",
    Imperial => "10",
});

log_enum!(CastStatus {
    Completed => "COMPLETED",
    PlayerCancelled => "PLAYER_CANCELLED",
    Interrupted => "INTERRUPTED",
});

log_enum!(EffectChangedStatus {
    Gained => "GAINED",
    Updated => "UPDATED",
    Faded => "FADED",
});

log_enum!(
    /// Outcome of a combat event (damage, heal, crowd control, failures...).
    CombatResultType {
        AbilityOnCooldown => "ABILITY_ON_COOLDOWN",
        BadTarget => "BAD_TARGET",
        BlockedDamage => "BLOCKED_DAMAGE",
        Busy => "BUSY",
        CannotUse => "CANNOT_USE",
        CantSeeTarget => "CANT_SEE_TARGET",
        CasterDead => "CASTER_DEAD",
        CriticalDamage => "CRITICAL_DAMAGE",
        CriticalHeal => "CRITICAL_HEAL",
        Damage => "DAMAGE",
        DamageShielded => "DAMAGE_SHIELDED",
        Died => "DIED",
        DiedXp => "DIED_XP",
        Disoriented => "DISORIENTED",
        Dodged => "DODGED",
        DotTickCritical => "DOT_TICK_CRITICAL",
        DotTick => "DOT_TICK",
        Failed => "FAILED",
        FailedRequirements => "FAILED_REQUIREMENTS",
        Feared => "FEARED",
        Heal => "HEAL",
        HotTick => "HOT_TICK",
        HotTickCritical => "HOT_TICK_CRITICAL",
        Immune => "IMMUNE",
        InsufficientResource => "INSUFFICIENT_RESOURCE",
        Interrupt => "INTERRUPT",
        KillingBlow => "KILLING_BLOW",
        Knockback => "KNOCKBACK",
        NoLocationFound => "NO_LOCATION_FOUND",
        Offbalance => "OFFBALANCE",
        PowerDrain => "POWER_DRAIN",
        PowerEnergize => "POWER_ENERGIZE",
        Queued => "QUEUED",
        Reflected => "REFLECTED",
        Resurrect => "RESURRECT",
        Reincarnating => "REINCARNATING",
        Rooted => "ROOTED",
        Snared => "SNARED",
        SoulGemResurrectionAccepted => "SOUL_GEM_RESURRECTION_ACCEPTED",
        Sprinting => "SPRINTING",
        Staggered => "STAGGERED",
        Stunned => "STUNNED",
        TargetDead => "TARGET_DEAD",
        TargetNotInView => "TARGET_NOT_IN_VIEW",
        TargetOutOfRange => "TARGET_OUT_OF_RANGE",
    }
);

impl CombatResultType {
    /// Results that reduce the target's health.
    pub fn is_damage(self) -> bool {
        matches!(
            self,
            Self::Damage
                | Self::CriticalDamage
                | Self::DotTick
                | Self::DotTickCritical
                | Self::BlockedDamage
                | Self::DamageShielded
        )
    }
}

log_enum!(DamageType {
    Bleed => "BLEED",
    Cold => "COLD",
    Disease => "DISEASE",
    Fire => "FIRE",
    Generic => "GENERIC",
    Invalid => "INVALID",
    Magic => "MAGIC",
    None => "NONE",
    Oblivion => "OBLIVION",
    Physical => "PHYSICAL",
    Poison => "POISON",
    Shock => "SHOCK",
});

log_enum!(ResourceType {
    // Possibly shield/absorption
    Unknown0 => "0",
    Magicka => "1",
    Stamina => "4",
    // Mixed cost abilities
    MagickaAndStamina => "5",
    Ultimate => "8",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_lookup() {
        assert_eq!(Hostility::from_code("HOSTILE"), Some(Hostility::Hostile));
        assert_eq!(Hostility::Hostile.code(), "HOSTILE");
        assert_eq!(Server::from_code("EU Megaserver"), Some(Server::Eu));
        assert_eq!(ClassId::from_code("117"), Some(ClassId::Arcanist));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(CastStatus::from_code("completed"), None);
        assert_eq!(TrialId::from_code("99"), None);
        assert_eq!(ResourceType::from_code("MAGICKA"), None);
    }

    #[test]
    fn display_uses_the_log_code() {
        assert_eq!(CombatResultType::DotTick.to_string(), "DOT_TICK");
        assert!(CombatResultType::DotTickCritical.is_damage());
        assert!(!CombatResultType::Heal.is_damage());
    }
}
