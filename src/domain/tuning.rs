//! Gameplay tuning for the arena.
//!
//! Keep this separate from runtime/server configuration (ports, channel sizes, etc.).

use super::ability::{Ability, AbilityTable};
use super::character::Character;
use super::triggers::{GiftTable, TriggerCase};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Starting stats for one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
}

impl CharacterSpec {
    pub fn spawn(&self) -> Character {
        Character::new(self.name.clone(), self.hp, self.atk, self.def)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// The streamer's character.
    pub player: CharacterSpec,

    /// The boss the audience fights.
    pub enemy: CharacterSpec,

    pub abilities: AbilityTable,

    pub gifts: GiftTable,

    /// Case policy for chat trigger matching.
    pub trigger_case: TriggerCase,

    /// Lower bound applied to every damage amount (0 = never negative).
    pub min_damage: i32,

    /// Heal multiplier granted by a like.
    pub like_multiplier: f64,

    /// Heal multiplier granted by a follow.
    pub follow_multiplier: f64,

    /// How long an armed shield waits for the next hit.
    pub shield_duration_ms: u64,

    /// Factor applied to the enemy's max hp and attack after each victory.
    pub enemy_growth: f64,

    pub victory_reset_delay_ms: u64,

    pub defeat_reset_delay_ms: u64,

    /// Period of the enemy's counterattack (0 disables it).
    pub enemy_strike_interval_ms: u64,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            player: CharacterSpec {
                name: "主播".to_string(),
                hp: 1000,
                atk: 100,
                def: 50,
            },
            enemy: CharacterSpec {
                name: "BOSS".to_string(),
                hp: 5000,
                atk: 150,
                def: 80,
            },
            abilities: AbilityTable::default(),
            gifts: GiftTable::default(),
            trigger_case: TriggerCase::default(),
            min_damage: 0,
            like_multiplier: 0.25,
            follow_multiplier: 0.5,
            shield_duration_ms: 5_000,
            enemy_growth: 1.1,
            victory_reset_delay_ms: 3_000,
            defeat_reset_delay_ms: 3_000,
            enemy_strike_interval_ms: 4_000,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TuningError {
    #[error("{who}: hp must be positive (got {hp})")]
    NonPositiveHp { who: &'static str, hp: i32 },

    #[error("{who}: atk and def must not be negative")]
    NegativeStat { who: &'static str },

    #[error("{0}: cooldown_ms must be positive")]
    ZeroCooldown(Ability),

    #[error("{0}: potency must be a finite, non-negative number")]
    InvalidPotency(Ability),

    #[error("shield potency must be within 0..=1 (got {0})")]
    ShieldOutOfRange(f64),

    #[error("gift {0:?}: base_multiplier must be a finite, non-negative number")]
    InvalidGiftMultiplier(String),

    #[error("{field} must be a finite, non-negative number")]
    InvalidMultiplier { field: &'static str },

    #[error("enemy_growth must be finite and at least 1.0 (got {0})")]
    InvalidGrowth(f64),

    #[error("min_damage must not be negative (got {0})")]
    NegativeMinDamage(i32),
}

impl ArenaTuning {
    /// Checks the invariants the combat engine relies on.
    pub fn validate(&self) -> Result<(), TuningError> {
        for (who, spec) in [("player", &self.player), ("enemy", &self.enemy)] {
            if spec.hp <= 0 {
                return Err(TuningError::NonPositiveHp { who, hp: spec.hp });
            }
            if spec.atk < 0 || spec.def < 0 {
                return Err(TuningError::NegativeStat { who });
            }
        }

        for (ability, spec) in self.abilities.iter() {
            if spec.cooldown_ms == 0 {
                return Err(TuningError::ZeroCooldown(ability));
            }
            if !is_non_negative(spec.potency) {
                return Err(TuningError::InvalidPotency(ability));
            }
        }
        if self.abilities.shield.potency > 1.0 {
            return Err(TuningError::ShieldOutOfRange(self.abilities.shield.potency));
        }

        let gift_multipliers = self
            .gifts
            .rules
            .iter()
            .map(|rule| (rule.gift_name.as_str(), rule.base_multiplier))
            .chain(std::iter::once(("<fallback>", self.gifts.fallback.base_multiplier)));
        for (name, multiplier) in gift_multipliers {
            if !is_non_negative(multiplier) {
                return Err(TuningError::InvalidGiftMultiplier(name.to_string()));
            }
        }

        if !is_non_negative(self.like_multiplier) {
            return Err(TuningError::InvalidMultiplier {
                field: "like_multiplier",
            });
        }
        if !is_non_negative(self.follow_multiplier) {
            return Err(TuningError::InvalidMultiplier {
                field: "follow_multiplier",
            });
        }
        if !self.enemy_growth.is_finite() || self.enemy_growth < 1.0 {
            return Err(TuningError::InvalidGrowth(self.enemy_growth));
        }
        if self.min_damage < 0 {
            return Err(TuningError::NegativeMinDamage(self.min_damage));
        }
        Ok(())
    }

    pub fn victory_reset_delay(&self) -> Duration {
        Duration::from_millis(self.victory_reset_delay_ms)
    }

    pub fn defeat_reset_delay(&self) -> Duration {
        Duration::from_millis(self.defeat_reset_delay_ms)
    }

    /// `None` when the enemy never strikes back.
    pub fn enemy_strike_interval(&self) -> Option<Duration> {
        (self.enemy_strike_interval_ms > 0)
            .then(|| Duration::from_millis(self.enemy_strike_interval_ms))
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_using_defaults_then_tuning_is_valid() {
        assert_eq!(ArenaTuning::default().validate(), Ok(()));
    }

    #[test]
    fn when_toml_overrides_a_subset_then_other_fields_keep_defaults() {
        let tuning: ArenaTuning = toml::from_str(
            r#"
            min_damage = 10
            trigger_case = "sensitive"

            [enemy]
            name = "Dragon"
            hp = 8000
            atk = 200
            def = 90

            [abilities.attack]
            cooldown_ms = 1000
            potency = 1.0
            triggers = ["attack", "hit"]
            "#,
        )
        .expect("expected tuning to parse");

        assert_eq!(tuning.min_damage, 10);
        assert_eq!(tuning.trigger_case, TriggerCase::Sensitive);
        assert_eq!(tuning.enemy.name, "Dragon");
        assert_eq!(tuning.abilities.attack.cooldown_ms, 1000);
        assert_eq!(tuning.abilities.heal, AbilityTable::default().heal);
        assert_eq!(tuning.player, ArenaTuning::default().player);
        assert_eq!(tuning.validate(), Ok(()));
    }

    #[test]
    fn when_cooldown_is_zero_then_validation_fails() {
        let mut tuning = ArenaTuning::default();
        tuning.abilities.ult.cooldown_ms = 0;
        assert_eq!(tuning.validate(), Err(TuningError::ZeroCooldown(Ability::Ult)));
    }

    #[test]
    fn when_enemy_hp_is_zero_then_validation_fails() {
        let mut tuning = ArenaTuning::default();
        tuning.enemy.hp = 0;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositiveHp { who: "enemy", .. })
        ));
    }

    #[test]
    fn when_shield_blocks_more_than_everything_then_validation_fails() {
        let mut tuning = ArenaTuning::default();
        tuning.abilities.shield.potency = 1.5;
        assert_eq!(tuning.validate(), Err(TuningError::ShieldOutOfRange(1.5)));
    }

    #[test]
    fn when_growth_shrinks_enemy_then_validation_fails() {
        let mut tuning = ArenaTuning::default();
        tuning.enemy_growth = 0.9;
        assert_eq!(tuning.validate(), Err(TuningError::InvalidGrowth(0.9)));
    }

    #[test]
    fn when_strike_interval_is_zero_then_strikes_are_disabled() {
        let mut tuning = ArenaTuning::default();
        tuning.enemy_strike_interval_ms = 0;
        assert_eq!(tuning.enemy_strike_interval(), None);
    }
}
