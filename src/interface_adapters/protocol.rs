// Wire protocol DTOs and conversions for webhook input and viewer output.

use crate::domain::{
    Ability, ActivationResult, Character, CombatSnapshot, Effect, EffectKind, EnemyStrike,
    RoundOutcome, RoundPhase,
};
use crate::use_cases::{ArenaUpdate, InteractionEvent, NormalizedEvent, RoundReport, Viewer};
use serde::{Deserialize, Serialize};

const CONNECTED_MESSAGE: &str = "WebSocket connected successfully";

/// Inbound webhook body as posted by the live-stream platform.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventDto {
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookDataDto,
    // Accepted but not verified here.
    #[serde(default)]
    pub sign: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookDataDto {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub gift_name: Option<String>,
    #[serde(default)]
    pub gift_count: Option<u32>,
    #[serde(default)]
    pub gift_price: Option<f64>,
    // Platform-side time; the arena stamps its own.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown event_type `{0}`")]
    UnknownEventType(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl TryFrom<WebhookEventDto> for InteractionEvent {
    type Error = ProtocolError;

    fn try_from(dto: WebhookEventDto) -> Result<Self, Self::Error> {
        let data = dto.data;
        let viewer = viewer_from(&data)?;

        let event = match dto.event_type.as_str() {
            "danmaku" => InteractionEvent::Chat {
                viewer,
                content: data.content.ok_or(ProtocolError::MissingField("content"))?,
            },
            "gift" => {
                let gift_name = data
                    .gift_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or(ProtocolError::MissingField("gift_name"))?;
                let gift_price = data.gift_price.unwrap_or(0.0);
                if !gift_price.is_finite() || gift_price < 0.0 {
                    return Err(ProtocolError::InvalidField {
                        field: "gift_price",
                        reason: "must be a non-negative number",
                    });
                }
                InteractionEvent::Gift {
                    viewer,
                    gift_name,
                    gift_count: data.gift_count.unwrap_or(1),
                    gift_price,
                }
            }
            "like" => InteractionEvent::Like { viewer },
            "follow" => InteractionEvent::Follow { viewer },
            "share" => InteractionEvent::Share { viewer },
            "enter_room" => InteractionEvent::EnterRoom { viewer },
            "exit_room" => InteractionEvent::ExitRoom { viewer },
            other => return Err(ProtocolError::UnknownEventType(other.to_string())),
        };
        Ok(event)
    }
}

fn viewer_from(data: &WebhookDataDto) -> Result<Viewer, ProtocolError> {
    let user_id = data
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ProtocolError::MissingField("user_id"))?;
    // Fall back to the id so logs and overlays always have a label.
    let user_name = data
        .user_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(user_id);
    Ok(Viewer {
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        avatar_url: data
            .avatar_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
    })
}

/// Messages the server sends to connected viewers over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Handshake acknowledgement, sent only to the new viewer.
    Connected { message: String, timestamp: u64 },
    Event(EventDto),
}

impl ServerMessage {
    pub fn connected(timestamp: u64) -> Self {
        ServerMessage::Connected {
            message: CONNECTED_MESSAGE.to_string(),
            timestamp,
        }
    }
}

impl From<ArenaUpdate> for ServerMessage {
    fn from(update: ArenaUpdate) -> Self {
        ServerMessage::Event(EventDto::from(update))
    }
}

/// Payload of an `event` envelope, tagged by what happened.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventDto {
    Danmaku(ChatEventDto),
    Gift(GiftEventDto),
    Like(ViewerEventDto),
    Follow(ViewerEventDto),
    Share(ViewerEventDto),
    EnterRoom(ViewerEventDto),
    ExitRoom(ViewerEventDto),
    Activation(ActivationResultDto),
    EnemyStrike(EnemyStrikeDto),
    Round(RoundReportDto),
    State(CombatSnapshotDto),
}

impl From<ArenaUpdate> for EventDto {
    fn from(update: ArenaUpdate) -> Self {
        match update {
            ArenaUpdate::Interaction(normalized) => EventDto::from(normalized),
            ArenaUpdate::Activation(result) => EventDto::Activation(result.into()),
            ArenaUpdate::EnemyStrike(strike) => EventDto::EnemyStrike(strike.into()),
            ArenaUpdate::Round(report) => EventDto::Round(report.into()),
            ArenaUpdate::State(snapshot) => EventDto::State(snapshot.into()),
        }
    }
}

impl From<NormalizedEvent> for EventDto {
    fn from(normalized: NormalizedEvent) -> Self {
        let NormalizedEvent {
            event,
            attempt,
            timestamp,
        } = normalized;
        let skill_type = attempt.map(|attempt| attempt.ability);
        let viewer_event = |viewer: Viewer| ViewerEventDto {
            user_id: viewer.user_id,
            user_name: viewer.user_name,
            avatar_url: viewer.avatar_url,
            skill_type,
            timestamp,
        };

        match event {
            InteractionEvent::Chat { viewer, content } => EventDto::Danmaku(ChatEventDto {
                user_id: viewer.user_id,
                user_name: viewer.user_name,
                avatar_url: viewer.avatar_url,
                content,
                skill_type,
                timestamp,
            }),
            InteractionEvent::Gift {
                viewer,
                gift_name,
                gift_count,
                gift_price,
            } => EventDto::Gift(GiftEventDto {
                user_id: viewer.user_id,
                user_name: viewer.user_name,
                avatar_url: viewer.avatar_url,
                gift_name,
                gift_count,
                gift_price,
                gift_effect: attempt.map(|attempt| GiftEffectDto {
                    skill_type: attempt.ability,
                    multiplier: attempt.multiplier,
                }),
                timestamp,
            }),
            InteractionEvent::Like { viewer } => EventDto::Like(viewer_event(viewer)),
            InteractionEvent::Follow { viewer } => EventDto::Follow(viewer_event(viewer)),
            InteractionEvent::Share { viewer } => EventDto::Share(viewer_event(viewer)),
            InteractionEvent::EnterRoom { viewer } => EventDto::EnterRoom(viewer_event(viewer)),
            InteractionEvent::ExitRoom { viewer } => EventDto::ExitRoom(viewer_event(viewer)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatEventDto {
    pub user_id: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub content: String,
    pub skill_type: Option<Ability>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftEventDto {
    pub user_id: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub gift_name: String,
    pub gift_count: u32,
    pub gift_price: f64,
    pub gift_effect: Option<GiftEffectDto>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftEffectDto {
    pub skill_type: Ability,
    pub multiplier: f64,
}

/// Like, follow, share and room presence events.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerEventDto {
    pub user_id: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_type: Option<Ability>,
    pub timestamp: u64,
}

/// Accepted activation as shown to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationResultDto {
    pub ability: Ability,
    pub actor_name: String,
    pub multiplier: f64,
    pub effect: EffectDto,
    pub player_hp: i32,
    pub enemy_hp: i32,
    pub timestamp: u64,
}

impl From<ActivationResult> for ActivationResultDto {
    fn from(result: ActivationResult) -> Self {
        Self {
            ability: result.ability,
            actor_name: result.actor_name,
            multiplier: result.multiplier,
            effect: result.effect.into(),
            player_hp: result.player_hp,
            enemy_hp: result.enemy_hp,
            timestamp: result.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDto {
    pub kind: EffectKindDto,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKindDto {
    Damage,
    Heal,
    Shield,
}

impl From<Effect> for EffectDto {
    fn from(effect: Effect) -> Self {
        let kind = match effect.kind {
            EffectKind::Damage => EffectKindDto::Damage,
            EffectKind::Heal => EffectKindDto::Heal,
            EffectKind::Shield => EffectKindDto::Shield,
        };
        Self {
            kind,
            amount: effect.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyStrikeDto {
    pub attacker: String,
    pub amount: i32,
    pub blocked: i32,
    pub player_hp: i32,
    pub timestamp: u64,
}

impl From<EnemyStrike> for EnemyStrikeDto {
    fn from(strike: EnemyStrike) -> Self {
        Self {
            attacker: strike.attacker,
            amount: strike.amount,
            blocked: strike.blocked,
            player_hp: strike.player_hp,
            timestamp: strike.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcomeDto {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundReportDto {
    pub outcome: RoundOutcomeDto,
    pub round: u32,
    pub timestamp: u64,
}

impl From<RoundReport> for RoundReportDto {
    fn from(report: RoundReport) -> Self {
        let outcome = match report.outcome {
            RoundOutcome::Victory => RoundOutcomeDto::Victory,
            RoundOutcome::Defeat => RoundOutcomeDto::Defeat,
        };
        Self {
            outcome,
            round: report.round,
            timestamp: report.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhaseDto {
    Fighting,
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDto {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub atk: i32,
    pub def: i32,
}

impl From<Character> for CharacterDto {
    fn from(character: Character) -> Self {
        Self {
            name: character.name,
            hp: character.hp,
            max_hp: character.max_hp,
            atk: character.atk,
            def: character.def,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownDto {
    pub ability: Ability,
    pub remaining_ms: u64,
}

/// Combat snapshot for viewers and the upstream controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatSnapshotDto {
    pub round: u32,
    pub phase: RoundPhaseDto,
    pub player: CharacterDto,
    pub enemy: CharacterDto,
    pub shield_active: bool,
    pub cooldowns: Vec<CooldownDto>,
    pub timestamp: u64,
}

impl From<CombatSnapshot> for CombatSnapshotDto {
    fn from(snapshot: CombatSnapshot) -> Self {
        let phase = match snapshot.phase {
            RoundPhase::Fighting => RoundPhaseDto::Fighting,
            RoundPhase::Victory => RoundPhaseDto::Victory,
            RoundPhase::Defeat => RoundPhaseDto::Defeat,
        };
        Self {
            round: snapshot.round,
            phase,
            player: snapshot.player.into(),
            enemy: snapshot.enemy.into(),
            shield_active: snapshot.shield_active,
            cooldowns: snapshot
                .cooldowns_remaining_ms
                .into_iter()
                .map(|(ability, remaining_ms)| CooldownDto {
                    ability,
                    remaining_ms,
                })
                .collect(),
            timestamp: snapshot.timestamp,
        }
    }
}
