// Trigger resolution: chat phrases and gift identities to abilities.

use super::ability::{Ability, AbilityTable};
use serde::{Deserialize, Serialize};

/// Case policy for chat trigger matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCase {
    /// Content and phrases are lowercased before matching.
    #[default]
    Insensitive,
    /// Phrases must appear exactly as configured.
    Sensitive,
}

impl AbilityTable {
    /// Returns the first ability, in priority order, whose trigger phrase is a
    /// substring of `content`.
    pub fn resolve_chat_trigger(&self, content: &str, case: TriggerCase) -> Option<Ability> {
        let content = match case {
            TriggerCase::Insensitive => content.to_lowercase(),
            TriggerCase::Sensitive => content.to_string(),
        };

        self.iter().find_map(|(ability, spec)| {
            let matched = spec.triggers.iter().any(|phrase| {
                if phrase.is_empty() {
                    return false;
                }
                match case {
                    TriggerCase::Insensitive => content.contains(&phrase.to_lowercase()),
                    TriggerCase::Sensitive => content.contains(phrase.as_str()),
                }
            });
            matched.then_some(ability)
        })
    }
}

/// Ability and multiplier produced by a gift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiftEffect {
    pub ability: Ability,
    pub multiplier: f64,
}

/// A named gift mapped to an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftRule {
    pub gift_name: String,
    pub ability: Ability,
    pub base_multiplier: f64,
}

/// Effect used for gifts missing from the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftFallback {
    pub ability: Ability,
    pub base_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GiftTable {
    pub rules: Vec<GiftRule>,
    pub fallback: GiftFallback,
}

impl GiftTable {
    /// Looks up the gift and scales its base multiplier by count and price.
    ///
    /// `base * log10(count + 1) * (price > 0 ? log10(price + 1) : 1)`
    pub fn resolve_gift_effect(&self, gift_name: &str, gift_count: u32, gift_price: f64) -> GiftEffect {
        let (ability, base) = self
            .rules
            .iter()
            .find(|rule| rule.gift_name == gift_name)
            .map(|rule| (rule.ability, rule.base_multiplier))
            .unwrap_or((self.fallback.ability, self.fallback.base_multiplier));

        let count = f64::from(gift_count.max(1));
        let price = if gift_price.is_finite() && gift_price > 0.0 {
            gift_price
        } else {
            0.0
        };
        let price_factor = if price > 0.0 { (price + 1.0).log10() } else { 1.0 };

        GiftEffect {
            ability,
            multiplier: base * (count + 1.0).log10() * price_factor,
        }
    }
}

impl Default for GiftTable {
    fn default() -> Self {
        let rule = |name: &str, ability, base_multiplier| GiftRule {
            gift_name: name.to_string(),
            ability,
            base_multiplier,
        };
        Self {
            rules: vec![
                rule("小心心", Ability::Heal, 1.0),
                rule("玫瑰", Ability::Attack, 1.5),
                rule("棒棒糖", Ability::Shield, 1.0),
                rule("嘉年华", Ability::Ult, 3.0),
            ],
            // Any other gift fires the ultimate.
            fallback: GiftFallback {
                ability: Ability::Ult,
                base_multiplier: 1.0,
            },
        }
    }
}
