// Maps interaction events to zero-or-one activation attempts.

use super::types::{ActivationAttempt, InteractionEvent};
use crate::domain::{Ability, ArenaTuning};

pub fn normalize(event: &InteractionEvent, tuning: &ArenaTuning) -> Option<ActivationAttempt> {
    match event {
        InteractionEvent::Chat { content, .. } => tuning
            .abilities
            .resolve_chat_trigger(content, tuning.trigger_case)
            .map(|ability| ActivationAttempt {
                ability,
                multiplier: 1.0,
            }),
        InteractionEvent::Gift {
            gift_name,
            gift_count,
            gift_price,
            ..
        } => {
            let effect = tuning
                .gifts
                .resolve_gift_effect(gift_name, *gift_count, *gift_price);
            Some(ActivationAttempt {
                ability: effect.ability,
                multiplier: effect.multiplier,
            })
        }
        // Passive engagement keeps the streamer alive without competing with chat.
        InteractionEvent::Like { .. } => Some(ActivationAttempt {
            ability: Ability::Heal,
            multiplier: tuning.like_multiplier,
        }),
        InteractionEvent::Follow { .. } => Some(ActivationAttempt {
            ability: Ability::Heal,
            multiplier: tuning.follow_multiplier,
        }),
        InteractionEvent::Share { .. }
        | InteractionEvent::EnterRoom { .. }
        | InteractionEvent::ExitRoom { .. } => None,
    }
}
