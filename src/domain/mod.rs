// Domain layer: combat rules, trigger matching and tuning.

pub mod ability;
pub mod character;
pub mod combat;
pub mod cooldown;
pub mod ports;
pub mod triggers;
pub mod tuning;

pub use ability::{Ability, AbilitySpec, AbilityTable};
pub use character::Character;
pub use combat::{
    Activation, ActivationResult, CombatError, CombatSession, CombatSnapshot, Effect, EffectKind,
    EnemyStrike, RoundOutcome, RoundPhase,
};
pub use cooldown::CooldownGate;
pub use triggers::{GiftEffect, GiftFallback, GiftRule, GiftTable, TriggerCase};
pub use tuning::{ArenaTuning, CharacterSpec, TuningError};
