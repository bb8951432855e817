// Combat resolution for one player/enemy session.

use super::ability::Ability;
use super::character::Character;
use super::cooldown::CooldownGate;
use super::tuning::ArenaTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Fighting,
    // Enemy at 0 hp; waiting for the victory reset.
    Victory,
    // Player at 0 hp; waiting for the defeat reset.
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Damage,
    Heal,
    // Amount is the percentage of the next hit that will be blocked.
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub kind: EffectKind,
    pub amount: i32,
}

/// Outcome of one accepted ability activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationResult {
    pub ability: Ability,
    pub actor_name: String,
    pub multiplier: f64,
    pub effect: Effect,
    pub player_hp: i32,
    pub enemy_hp: i32,
    pub timestamp: u64,
}

/// The enemy's periodic counterattack against the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyStrike {
    pub attacker: String,
    pub amount: i32,
    // Damage absorbed by the player's shield.
    pub blocked: i32,
    pub player_hp: i32,
    pub timestamp: u64,
}

/// A resolved combat action plus the round outcome it caused, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub result: T,
    pub outcome: Option<RoundOutcome>,
}

pub type Activation = Resolved<ActivationResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    // Activations are locked between a terminal hit and the round reset.
    #[error("round is over; waiting for reset")]
    RoundLocked,
}

/// Point-in-time view of the session for controllers and new viewers.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatSnapshot {
    pub round: u32,
    pub phase: RoundPhase,
    pub player: Character,
    pub enemy: Character,
    pub shield_active: bool,
    pub cooldowns_remaining_ms: Vec<(Ability, u64)>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy)]
struct Shield {
    block_fraction: f64,
    expires_at_ms: u64,
}

pub struct CombatSession {
    tuning: ArenaTuning,
    player: Character,
    enemy: Character,
    shield: Option<Shield>,
    round: u32,
    phase: RoundPhase,
}

impl CombatSession {
    pub fn new(tuning: ArenaTuning) -> Self {
        let player = tuning.player.spawn();
        let enemy = tuning.enemy.spawn();
        Self {
            tuning,
            player,
            enemy,
            shield: None,
            round: 1,
            phase: RoundPhase::Fighting,
        }
    }

    pub fn tuning(&self) -> &ArenaTuning {
        &self.tuning
    }

    pub fn player(&self) -> &Character {
        &self.player
    }

    pub fn enemy(&self) -> &Character {
        &self.enemy
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn accepts_activations(&self) -> bool {
        self.phase == RoundPhase::Fighting
    }

    pub fn shield_active(&self, now_ms: u64) -> bool {
        self.shield.is_some_and(|shield| now_ms < shield.expires_at_ms)
    }

    /// Applies an accepted activation to the session.
    pub fn apply_ability(
        &mut self,
        ability: Ability,
        multiplier: f64,
        actor_name: &str,
        now_ms: u64,
    ) -> Result<Activation, CombatError> {
        if !self.accepts_activations() {
            return Err(CombatError::RoundLocked);
        }

        let multiplier = sanitize_multiplier(multiplier);
        let potency = self.tuning.abilities.get(ability).potency;
        let effect = match ability {
            Ability::Heal => {
                let amount = floor_amount(potency * multiplier);
                self.player.heal(amount);
                Effect {
                    kind: EffectKind::Heal,
                    amount,
                }
            }
            Ability::Attack => {
                let base = f64::from(self.player.atk - self.enemy.def);
                self.hit_enemy(floor_amount(base * potency * multiplier))
            }
            Ability::Shield => {
                self.shield = Some(Shield {
                    block_fraction: potency.clamp(0.0, 1.0),
                    expires_at_ms: now_ms.saturating_add(self.tuning.shield_duration_ms),
                });
                Effect {
                    kind: EffectKind::Shield,
                    amount: floor_amount(potency.clamp(0.0, 1.0) * 100.0),
                }
            }
            Ability::Ult => {
                let base = f64::from(self.player.atk);
                self.hit_enemy(floor_amount(base * potency * multiplier))
            }
        };

        let outcome = self.settle();
        Ok(Resolved {
            result: ActivationResult {
                ability,
                actor_name: actor_name.to_string(),
                multiplier,
                effect,
                player_hp: self.player.hp,
                enemy_hp: self.enemy.hp,
                timestamp: now_ms,
            },
            outcome,
        })
    }

    /// Resolves one enemy counterattack; an armed shield absorbs part of it.
    pub fn enemy_strike(&mut self, now_ms: u64) -> Result<Resolved<EnemyStrike>, CombatError> {
        if !self.accepts_activations() {
            return Err(CombatError::RoundLocked);
        }

        let raw = (self.enemy.atk - self.player.def).max(self.tuning.min_damage);
        let blocked = match self.shield.take() {
            Some(shield) if now_ms < shield.expires_at_ms => {
                floor_amount(f64::from(raw) * shield.block_fraction)
            }
            _ => 0,
        };
        let amount = raw - blocked;
        self.player.take_damage(amount);

        let outcome = self.settle();
        Ok(Resolved {
            result: EnemyStrike {
                attacker: self.enemy.name.clone(),
                amount,
                blocked,
                player_hp: self.player.hp,
                timestamp: now_ms,
            },
            outcome,
        })
    }

    /// Finishes a won or lost round and reopens the session for activations.
    pub fn complete_round(&mut self) -> Option<RoundOutcome> {
        let completed = match self.phase {
            RoundPhase::Fighting => return None,
            RoundPhase::Victory => {
                self.enemy.grow(self.tuning.enemy_growth);
                self.round += 1;
                RoundOutcome::Victory
            }
            RoundPhase::Defeat => {
                self.player.restore();
                self.enemy.restore();
                RoundOutcome::Defeat
            }
        };
        self.shield = None;
        self.phase = RoundPhase::Fighting;
        Some(completed)
    }

    /// Rebuilds both characters from tuning and starts again at round 1.
    pub fn restart(&mut self) {
        self.player = self.tuning.player.spawn();
        self.enemy = self.tuning.enemy.spawn();
        self.shield = None;
        self.round = 1;
        self.phase = RoundPhase::Fighting;
    }

    pub fn snapshot(&self, gate: &CooldownGate, now_ms: u64) -> CombatSnapshot {
        CombatSnapshot {
            round: self.round,
            phase: self.phase,
            player: self.player.clone(),
            enemy: self.enemy.clone(),
            shield_active: self.shield_active(now_ms),
            cooldowns_remaining_ms: Ability::ALL
                .into_iter()
                .map(|ability| (ability, gate.remaining_ms(ability, now_ms)))
                .collect(),
            timestamp: now_ms,
        }
    }

    fn hit_enemy(&mut self, amount: i32) -> Effect {
        let amount = amount.max(self.tuning.min_damage);
        self.enemy.take_damage(amount);
        Effect {
            kind: EffectKind::Damage,
            amount,
        }
    }

    // Moves to a terminal phase at most once per round.
    fn settle(&mut self) -> Option<RoundOutcome> {
        if self.phase != RoundPhase::Fighting {
            return None;
        }
        if self.enemy.is_defeated() {
            self.phase = RoundPhase::Victory;
            Some(RoundOutcome::Victory)
        } else if self.player.is_defeated() {
            self.phase = RoundPhase::Defeat;
            Some(RoundOutcome::Defeat)
        } else {
            None
        }
    }
}

fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier > 0.0 {
        multiplier
    } else {
        0.0
    }
}

// Float to int conversion saturates, so oversized products cannot wrap.
fn floor_amount(value: f64) -> i32 {
    value.floor() as i32
}
