// Use-case level inputs/outputs for the arena loop.

use crate::domain::{
    Ability, ActivationResult, CombatSnapshot, EnemyStrike, RoundOutcome,
};
use tokio::sync::oneshot;

/// Who produced an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub user_name: String,
    pub avatar_url: Option<String>,
}

/// One audience interaction, already validated by the ingestion adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    Chat {
        viewer: Viewer,
        content: String,
    },
    Gift {
        viewer: Viewer,
        gift_name: String,
        gift_count: u32,
        gift_price: f64,
    },
    Like {
        viewer: Viewer,
    },
    Follow {
        viewer: Viewer,
    },
    // Display-only events: broadcast, never activate an ability.
    Share {
        viewer: Viewer,
    },
    EnterRoom {
        viewer: Viewer,
    },
    ExitRoom {
        viewer: Viewer,
    },
}

impl InteractionEvent {
    pub fn viewer(&self) -> &Viewer {
        match self {
            InteractionEvent::Chat { viewer, .. }
            | InteractionEvent::Gift { viewer, .. }
            | InteractionEvent::Like { viewer }
            | InteractionEvent::Follow { viewer }
            | InteractionEvent::Share { viewer }
            | InteractionEvent::EnterRoom { viewer }
            | InteractionEvent::ExitRoom { viewer } => viewer,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InteractionEvent::Chat { .. } => "danmaku",
            InteractionEvent::Gift { .. } => "gift",
            InteractionEvent::Like { .. } => "like",
            InteractionEvent::Follow { .. } => "follow",
            InteractionEvent::Share { .. } => "share",
            InteractionEvent::EnterRoom { .. } => "enter_room",
            InteractionEvent::ExitRoom { .. } => "exit_room",
        }
    }
}

/// Candidate activation derived from an interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationAttempt {
    pub ability: Ability,
    pub multiplier: f64,
}

/// An interaction plus the activation it asked for, stamped for display.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub event: InteractionEvent,
    pub attempt: Option<ActivationAttempt>,
    pub timestamp: u64,
}

/// Round transition announced to viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    pub round: u32,
    pub timestamp: u64,
}

/// Everything the arena loop publishes for viewers.
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaUpdate {
    Interaction(NormalizedEvent),
    Activation(ActivationResult),
    EnemyStrike(EnemyStrike),
    Round(RoundReport),
    State(CombatSnapshot),
}

/// Commands accepted by the arena loop.
#[derive(Debug)]
pub enum ArenaCommand {
    Interaction(InteractionEvent),
    Snapshot {
        reply: oneshot::Sender<CombatSnapshot>,
    },
    Restart {
        reply: oneshot::Sender<CombatSnapshot>,
    },
}
