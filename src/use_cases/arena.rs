// Arena orchestration: the single task that owns combat and cooldown state.

use super::normalizer::normalize;
use super::types::{
    ArenaCommand, ArenaUpdate, InteractionEvent, NormalizedEvent, RoundReport,
};
use crate::domain::ports::Clock;
use crate::domain::{
    ArenaTuning, CombatSession, CombatSnapshot, CooldownGate, RoundOutcome, RoundPhase,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

// Placeholder period for the strike timer when strikes are disabled.
const IDLE_PERIOD: Duration = Duration::from_secs(3600);

/// Channel sizing for a spawned arena.
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    /// Capacity for inbound commands (interactions, snapshot requests).
    pub command_channel_capacity: usize,
    /// Capacity for broadcast arena updates.
    pub update_broadcast_capacity: usize,
}

/// Combat session plus its cooldown gate; the synchronous core of the pipeline.
pub struct ArenaSession {
    combat: CombatSession,
    gate: CooldownGate,
}

impl ArenaSession {
    pub fn new(tuning: ArenaTuning) -> Self {
        let gate = CooldownGate::new(&tuning.abilities);
        Self {
            combat: CombatSession::new(tuning),
            gate,
        }
    }

    pub fn tuning(&self) -> &ArenaTuning {
        self.combat.tuning()
    }

    /// Normalize, gate and apply one interaction.
    ///
    /// The interaction itself is always published; an activation result (and a
    /// round report on a terminal hit) follows only when the attempt is accepted.
    pub fn handle_interaction(&mut self, event: InteractionEvent, now_ms: u64) -> Vec<ArenaUpdate> {
        let attempt = normalize(&event, self.combat.tuning());
        let actor_name = event.viewer().user_name.clone();
        let mut updates = vec![ArenaUpdate::Interaction(NormalizedEvent {
            event,
            attempt,
            timestamp: now_ms,
        })];

        let Some(attempt) = attempt else {
            return updates;
        };

        // Check the lock first so a locked window never burns a cooldown.
        if !self.combat.accepts_activations() {
            debug!(ability = %attempt.ability, "round locked; activation dropped");
            return updates;
        }
        if !self.gate.try_activate(attempt.ability, now_ms) {
            debug!(
                ability = %attempt.ability,
                remaining_ms = self.gate.remaining_ms(attempt.ability, now_ms),
                "ability on cooldown; activation dropped"
            );
            return updates;
        }

        match self
            .combat
            .apply_ability(attempt.ability, attempt.multiplier, &actor_name, now_ms)
        {
            Ok(activation) => {
                info!(
                    ability = %attempt.ability,
                    actor = %actor_name,
                    multiplier = activation.result.multiplier,
                    amount = activation.result.effect.amount,
                    enemy_hp = activation.result.enemy_hp,
                    player_hp = activation.result.player_hp,
                    "ability activated"
                );
                updates.push(ArenaUpdate::Activation(activation.result));
                if let Some(outcome) = activation.outcome {
                    updates.push(self.round_report(outcome, now_ms));
                }
            }
            Err(err) => debug!(error = %err, "activation rejected"),
        }
        updates
    }

    /// Resolves one enemy counterattack.
    pub fn strike(&mut self, now_ms: u64) -> Vec<ArenaUpdate> {
        match self.combat.enemy_strike(now_ms) {
            Ok(strike) => {
                debug!(
                    amount = strike.result.amount,
                    blocked = strike.result.blocked,
                    player_hp = strike.result.player_hp,
                    "enemy strike"
                );
                let mut updates = vec![ArenaUpdate::EnemyStrike(strike.result)];
                if let Some(outcome) = strike.outcome {
                    updates.push(self.round_report(outcome, now_ms));
                }
                updates
            }
            Err(_) => Vec::new(),
        }
    }

    /// Applies the pending victory/defeat reset and publishes the new state.
    pub fn complete_round(&mut self, now_ms: u64) -> Vec<ArenaUpdate> {
        match self.combat.complete_round() {
            Some(outcome) => {
                info!(?outcome, round = self.combat.round(), "round reset");
                vec![ArenaUpdate::State(self.snapshot(now_ms))]
            }
            None => Vec::new(),
        }
    }

    /// Starts a fresh session: characters from tuning, cooldowns cleared.
    pub fn restart(&mut self, now_ms: u64) -> CombatSnapshot {
        self.combat.restart();
        self.gate.clear();
        info!("arena restarted");
        self.snapshot(now_ms)
    }

    pub fn snapshot(&self, now_ms: u64) -> CombatSnapshot {
        self.combat.snapshot(&self.gate, now_ms)
    }

    /// Delay before the pending round reset, if the round is over.
    pub fn pending_reset_delay(&self) -> Option<Duration> {
        let tuning = self.combat.tuning();
        match self.combat.phase() {
            RoundPhase::Fighting => None,
            RoundPhase::Victory => Some(tuning.victory_reset_delay()),
            RoundPhase::Defeat => Some(tuning.defeat_reset_delay()),
        }
    }

    fn round_report(&self, outcome: RoundOutcome, now_ms: u64) -> ArenaUpdate {
        info!(?outcome, round = self.combat.round(), "round over");
        ArenaUpdate::Round(RoundReport {
            outcome,
            round: self.combat.round(),
            timestamp: now_ms,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena command queue is full")]
    Busy,
    #[error("arena task is not running")]
    Closed,
}

/// Cloneable handle to a running arena task.
#[derive(Clone)]
pub struct ArenaHandle {
    command_tx: mpsc::Sender<ArenaCommand>,
    update_tx: broadcast::Sender<ArenaUpdate>,
}

impl ArenaHandle {
    /// Spawns the arena task and returns a handle to it.
    pub fn spawn<C>(session: ArenaSession, clock: C, settings: &ArenaSettings) -> Self
    where
        C: Clock + 'static,
    {
        let (command_tx, command_rx) =
            mpsc::channel::<ArenaCommand>(settings.command_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel::<ArenaUpdate>(settings.update_broadcast_capacity);

        tokio::spawn(arena_task(command_rx, update_tx.clone(), session, clock));

        Self {
            command_tx,
            update_tx,
        }
    }

    /// Queues an interaction without waiting; the webhook must never block.
    pub fn submit(&self, event: InteractionEvent) -> Result<(), ArenaError> {
        self.command_tx
            .try_send(ArenaCommand::Interaction(event))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => ArenaError::Busy,
                mpsc::error::TrySendError::Closed(_) => ArenaError::Closed,
            })
    }

    pub async fn snapshot(&self) -> Result<CombatSnapshot, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(ArenaCommand::Snapshot { reply }, rx).await
    }

    pub async fn restart(&self) -> Result<CombatSnapshot, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(ArenaCommand::Restart { reply }, rx).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArenaUpdate> {
        self.update_tx.subscribe()
    }

    async fn request(
        &self,
        command: ArenaCommand,
        rx: oneshot::Receiver<CombatSnapshot>,
    ) -> Result<CombatSnapshot, ArenaError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ArenaError::Closed)?;
        rx.await.map_err(|_| ArenaError::Closed)
    }
}

/// Processes commands to completion one at a time, so combat and cooldown
/// state are never touched concurrently.
pub async fn arena_task<C: Clock>(
    mut command_rx: mpsc::Receiver<ArenaCommand>,
    update_tx: broadcast::Sender<ArenaUpdate>,
    mut session: ArenaSession,
    clock: C,
) {
    let strike_period = session.tuning().enemy_strike_interval();
    let period = strike_period.unwrap_or(IDLE_PERIOD);
    let mut strikes = tokio::time::interval_at(Instant::now() + period, period);
    strikes.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Deferred round reset; re-armed after each terminal hit.
    let reset = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(reset);
    let mut reset_armed = false;

    loop {
        let updates = tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else {
                    info!("arena command channel closed; arena exiting");
                    break;
                };
                let now = clock.now_millis();
                match command {
                    ArenaCommand::Interaction(event) => session.handle_interaction(event, now),
                    ArenaCommand::Snapshot { reply } => {
                        let _ = reply.send(session.snapshot(now));
                        Vec::new()
                    }
                    ArenaCommand::Restart { reply } => {
                        // A restart cancels any pending round reset.
                        reset_armed = false;
                        let snapshot = session.restart(now);
                        let _ = reply.send(snapshot.clone());
                        vec![ArenaUpdate::State(snapshot)]
                    }
                }
            }
            () = &mut reset, if reset_armed => {
                reset_armed = false;
                session.complete_round(clock.now_millis())
            }
            _ = strikes.tick(), if strike_period.is_some() => {
                session.strike(clock.now_millis())
            }
        };

        if !reset_armed {
            if let Some(delay) = session.pending_reset_delay() {
                reset.as_mut().reset(Instant::now() + delay);
                reset_armed = true;
            }
        }

        for update in updates {
            // No subscribers just means no viewers are attached.
            let _ = update_tx.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ManualClock;
    use crate::domain::{Ability, EffectKind};
    use crate::use_cases::types::Viewer;

    fn viewer(name: &str) -> Viewer {
        Viewer {
            user_id: format!("id-{name}"),
            user_name: name.to_string(),
            avatar_url: None,
        }
    }

    fn chat(content: &str) -> InteractionEvent {
        InteractionEvent::Chat {
            viewer: viewer("观众"),
            content: content.to_string(),
        }
    }

    fn quiet_tuning() -> ArenaTuning {
        ArenaTuning {
            enemy_strike_interval_ms: 0,
            victory_reset_delay_ms: 20,
            defeat_reset_delay_ms: 20,
            ..ArenaTuning::default()
        }
    }

    #[test]
    fn when_chat_triggers_attack_then_interaction_and_activation_are_published() {
        let mut session = ArenaSession::new(quiet_tuning());

        let updates = session.handle_interaction(chat("攻击!"), 1_000);

        assert_eq!(updates.len(), 2);
        match &updates[0] {
            ArenaUpdate::Interaction(normalized) => {
                assert_eq!(normalized.attempt.map(|a| a.ability), Some(Ability::Attack));
                assert_eq!(normalized.timestamp, 1_000);
            }
            other => panic!("expected interaction, got {other:?}"),
        }
        match &updates[1] {
            ArenaUpdate::Activation(result) => {
                assert_eq!(result.ability, Ability::Attack);
                assert_eq!(result.actor_name, "观众");
                assert_eq!(result.effect.kind, EffectKind::Damage);
            }
            other => panic!("expected activation, got {other:?}"),
        }
    }

    #[test]
    fn when_chat_has_no_trigger_then_only_interaction_is_published() {
        let mut session = ArenaSession::new(quiet_tuning());

        let updates = session.handle_interaction(chat("666"), 1_000);

        assert!(matches!(updates.as_slice(), [ArenaUpdate::Interaction(_)]));
    }

    #[test]
    fn when_ability_is_on_cooldown_then_activation_is_silently_dropped() {
        let mut session = ArenaSession::new(quiet_tuning());

        assert_eq!(session.handle_interaction(chat("攻击"), 1_000).len(), 2);
        assert_eq!(session.handle_interaction(chat("攻击"), 1_500).len(), 1);
        assert_eq!(session.handle_interaction(chat("攻击"), 3_000).len(), 2);
    }

    #[test]
    fn when_like_heals_first_then_chat_heal_waits_for_the_shared_cooldown() {
        let mut session = ArenaSession::new(quiet_tuning());

        let liked = session.handle_interaction(
            InteractionEvent::Like {
                viewer: viewer("点赞"),
            },
            0,
        );
        match liked.as_slice() {
            [ArenaUpdate::Interaction(_), ArenaUpdate::Activation(result)] => {
                assert_eq!(result.ability, Ability::Heal);
                assert_eq!(result.multiplier, 0.25);
                assert_eq!(result.effect.amount, 50);
            }
            other => panic!("expected like heal, got {other:?}"),
        }

        // Like and chat heals share one cooldown slot.
        let blocked = session.handle_interaction(chat("治疗"), 100);
        assert!(matches!(blocked.as_slice(), [ArenaUpdate::Interaction(_)]));

        let healed = session.handle_interaction(chat("治疗"), 5_000);
        assert!(matches!(
            healed.as_slice(),
            [ArenaUpdate::Interaction(_), ArenaUpdate::Activation(result)]
                if result.multiplier == 1.0
        ));
    }

    #[test]
    fn when_enemy_falls_then_round_report_follows_activation_once() {
        let mut tuning = quiet_tuning();
        tuning.enemy.hp = 30;
        let mut session = ArenaSession::new(tuning);

        let updates = session.handle_interaction(chat("必杀技"), 1_000);

        assert_eq!(updates.len(), 3);
        assert!(matches!(
            updates[2],
            ArenaUpdate::Round(RoundReport {
                outcome: RoundOutcome::Victory,
                round: 1,
                ..
            })
        ));
        let again = session.handle_interaction(chat("攻击"), 1_001);
        assert!(matches!(again.as_slice(), [ArenaUpdate::Interaction(_)]));
        assert_eq!(session.pending_reset_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn when_round_is_locked_then_cooldown_is_not_consumed() {
        let mut tuning = quiet_tuning();
        tuning.enemy.hp = 30;
        let mut session = ArenaSession::new(tuning);
        session.handle_interaction(chat("必杀技"), 0);

        // Heal during the locked window is dropped before the gate.
        assert_eq!(session.handle_interaction(chat("治疗"), 10).len(), 1);

        let reset = session.complete_round(15);
        assert!(matches!(reset.as_slice(), [ArenaUpdate::State(_)]));
        assert_eq!(session.handle_interaction(chat("治疗"), 20).len(), 2);
    }

    #[test]
    fn when_restarted_then_cooldowns_are_cleared() {
        let mut session = ArenaSession::new(quiet_tuning());
        session.handle_interaction(chat("必杀技"), 0);

        let snapshot = session.restart(10);

        assert!(snapshot.cooldowns_remaining_ms.iter().all(|(_, ms)| *ms == 0));
        assert_eq!(snapshot.enemy.hp, snapshot.enemy.max_hp);
        assert_eq!(session.handle_interaction(chat("必杀技"), 20).len(), 2);
    }

    #[test]
    fn when_strike_kills_player_then_defeat_is_reported() {
        let mut tuning = quiet_tuning();
        tuning.player.hp = 50;
        let mut session = ArenaSession::new(tuning);

        let updates = session.strike(5);

        assert!(matches!(
            updates.as_slice(),
            [
                ArenaUpdate::EnemyStrike(_),
                ArenaUpdate::Round(RoundReport {
                    outcome: RoundOutcome::Defeat,
                    ..
                })
            ]
        ));
        assert!(session.strike(6).is_empty());
    }

    async fn next_update(rx: &mut broadcast::Receiver<ArenaUpdate>) -> ArenaUpdate {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for arena update")
            .expect("arena update channel closed")
    }

    fn settings() -> ArenaSettings {
        ArenaSettings {
            command_channel_capacity: 16,
            update_broadcast_capacity: 16,
        }
    }

    #[tokio::test]
    async fn when_lethal_interaction_is_submitted_then_task_resets_round_after_delay() {
        let mut tuning = quiet_tuning();
        tuning.enemy.hp = 30;
        let arena = ArenaHandle::spawn(ArenaSession::new(tuning), ManualClock::new(1_000), &settings());
        let mut rx = arena.subscribe();

        arena.submit(chat("必杀技")).expect("expected submit to succeed");

        assert!(matches!(next_update(&mut rx).await, ArenaUpdate::Interaction(_)));
        assert!(matches!(next_update(&mut rx).await, ArenaUpdate::Activation(_)));
        assert!(matches!(next_update(&mut rx).await, ArenaUpdate::Round(_)));
        match next_update(&mut rx).await {
            ArenaUpdate::State(snapshot) => {
                assert_eq!(snapshot.round, 2);
                assert_eq!(snapshot.phase, RoundPhase::Fighting);
                assert_eq!(snapshot.enemy.hp, snapshot.enemy.max_hp);
            }
            other => panic!("expected state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_restart_is_requested_then_pending_reset_is_cancelled() {
        let mut tuning = quiet_tuning();
        tuning.enemy.hp = 30;
        tuning.victory_reset_delay_ms = 100;
        let arena = ArenaHandle::spawn(ArenaSession::new(tuning), ManualClock::new(1_000), &settings());
        let mut rx = arena.subscribe();

        arena.submit(chat("必杀技")).expect("expected submit to succeed");
        let snapshot = arena.restart().await.expect("expected restart");
        assert_eq!(snapshot.round, 1);
        assert_eq!(snapshot.phase, RoundPhase::Fighting);

        // Interaction, activation, round report, then the restart state.
        for _ in 0..3 {
            next_update(&mut rx).await;
        }
        assert!(matches!(next_update(&mut rx).await, ArenaUpdate::State(_)));

        // The cancelled victory reset must not grow the enemy later.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        let current = arena.snapshot().await.expect("expected snapshot");
        assert_eq!(current.round, 1);
        assert_eq!(current.enemy.max_hp, 30);
    }
}
