// Per-ability cooldown bookkeeping.

use super::ability::{Ability, AbilityTable};

/// Admits an activation only once its ability's cooldown has elapsed.
///
/// The gate is owned by the single arena task, so the admission check and the
/// timestamp update happen inside one `&mut self` call and cannot interleave.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown_ms: [u64; 4],
    last_activated_ms: [Option<u64>; 4],
}

impl CooldownGate {
    pub fn new(abilities: &AbilityTable) -> Self {
        let mut cooldown_ms = [0; 4];
        for (ability, spec) in abilities.iter() {
            cooldown_ms[ability.index()] = spec.cooldown_ms;
        }
        Self {
            cooldown_ms,
            last_activated_ms: [None; 4],
        }
    }

    /// Returns true and records `now_ms` if the ability is off cooldown.
    pub fn try_activate(&mut self, ability: Ability, now_ms: u64) -> bool {
        if self.remaining_ms(ability, now_ms) > 0 {
            return false;
        }
        self.last_activated_ms[ability.index()] = Some(now_ms);
        true
    }

    /// Time left before the ability can fire again (0 when ready).
    pub fn remaining_ms(&self, ability: Ability, now_ms: u64) -> u64 {
        let idx = ability.index();
        match self.last_activated_ms[idx] {
            None => 0,
            Some(last) => {
                // A clock that moved backwards counts as no time elapsed.
                let elapsed = now_ms.saturating_sub(last);
                self.cooldown_ms[idx].saturating_sub(elapsed)
            }
        }
    }

    /// Forgets every recorded activation.
    pub fn clear(&mut self) {
        self.last_activated_ms = [None; 4];
    }
}
