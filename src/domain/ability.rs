// Fixed ability set and the per-ability configuration table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four combat actions the audience can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Heal,
    Attack,
    Shield,
    Ult,
}

impl Ability {
    /// Trigger priority order used when scanning chat content.
    pub const ALL: [Ability; 4] = [Ability::Heal, Ability::Attack, Ability::Shield, Ability::Ult];

    pub fn as_str(self) -> &'static str {
        match self {
            Ability::Heal => "heal",
            Ability::Attack => "attack",
            Ability::Shield => "shield",
            Ability::Ult => "ult",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Ability::Heal => 0,
            Ability::Attack => 1,
            Ability::Shield => 2,
            Ability::Ult => 3,
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySpec {
    /// Minimum time between two accepted activations.
    pub cooldown_ms: u64,

    /// Heal amount for `heal`, block fraction for `shield`, damage multiplier
    /// baseline for `attack` and `ult`.
    pub potency: f64,

    /// Substrings of chat content that select this ability.
    pub triggers: Vec<String>,
}

impl AbilitySpec {
    fn new(cooldown_ms: u64, potency: f64, triggers: &[&str]) -> Self {
        Self {
            cooldown_ms,
            potency,
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// The ability table, one entry per ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityTable {
    pub heal: AbilitySpec,
    pub attack: AbilitySpec,
    pub shield: AbilitySpec,
    pub ult: AbilitySpec,
}

impl AbilityTable {
    pub fn get(&self, ability: Ability) -> &AbilitySpec {
        match ability {
            Ability::Heal => &self.heal,
            Ability::Attack => &self.attack,
            Ability::Shield => &self.shield,
            Ability::Ult => &self.ult,
        }
    }

    /// Iterates entries in trigger priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Ability, &AbilitySpec)> {
        Ability::ALL.into_iter().map(move |ability| (ability, self.get(ability)))
    }
}

impl Default for AbilityTable {
    fn default() -> Self {
        Self {
            heal: AbilitySpec::new(5_000, 200.0, &["治疗", "回血", "奶一口"]),
            attack: AbilitySpec::new(2_000, 1.0, &["攻击", "打", "砍"]),
            shield: AbilitySpec::new(10_000, 0.5, &["护盾", "防御", "格挡"]),
            ult: AbilitySpec::new(30_000, 3.0, &["必杀技", "大招", "绝招"]),
        }
    }
}
