use crate::interface_adapters::protocol::{EventDto, ServerMessage};
use crate::interface_adapters::registry::{ConnId, ConnectionRegistry, RegistryError};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ArenaError, ArenaHandle, ArenaUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes bootstrap failures; only surfaced through logs.
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    #[allow(dead_code)]
    Registry(RegistryError),
    #[allow(dead_code)]
    Arena(ArenaError),
}

/// Turns arena updates into wire envelopes and fans them out to viewers.
pub async fn update_serializer(
    mut updates_rx: broadcast::Receiver<ArenaUpdate>,
    registry: Arc<ConnectionRegistry>,
    arena: ArenaHandle,
) {
    loop {
        match updates_rx.recv().await {
            Ok(update) => publish(&registry, &ServerMessage::from(update)),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "update serializer lagged; sending snapshot");
                // Resync strategy: viewers get the current state instead of the gap.
                match arena.snapshot().await {
                    Ok(snapshot) => publish(
                        &registry,
                        &ServerMessage::Event(EventDto::State(snapshot.into())),
                    ),
                    Err(e) => warn!(error = %e, "snapshot unavailable during lag recovery"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("arena updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

fn publish(registry: &ConnectionRegistry, msg: &ServerMessage) {
    match registry.broadcast(msg) {
        Ok(report) => {
            if report.skipped > 0 || report.pruned > 0 {
                debug!(
                    delivered = report.delivered,
                    skipped = report.skipped,
                    pruned = report.pruned,
                    "partial broadcast"
                );
            }
        }
        Err(e) => error!(error = %e, "failed to serialize arena update"),
    }
}

pub fn spawn_update_serializer(arena: &ArenaHandle, registry: Arc<ConnectionRegistry>) {
    // Subscribe here, before returning, so no update published after startup is missed.
    tokio::spawn(update_serializer(arena.subscribe(), registry, arena.clone()));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // The registry assigns the id, so it is recorded once known.
    let span = info_span!("conn", conn_id = tracing::field::Empty);
    serve_viewer(socket, state, span.clone())
        .instrument(span)
        .await;
}

async fn serve_viewer(mut socket: WebSocket, state: Arc<AppState>, span: Span) {
    let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(state.viewer_channel_capacity);

    let conn_id = match bootstrap_connection(&state, tx).await {
        Ok(conn_id) => conn_id,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    span.record("conn_id", conn_id);
    info!(viewers = state.registry.len(), "viewer connected");

    let mut ctx = ConnCtx::new();
    run_client_loop(&mut socket, &mut rx, &mut ctx).await;

    state.registry.unregister(conn_id);
    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_out = ctx.bytes_out,
        "connection stats"
    );
    info!("viewer disconnected");
}

// Registers the viewer (queuing the ack) and queues the current snapshot.
async fn bootstrap_connection(
    state: &AppState,
    tx: mpsc::Sender<Utf8Bytes>,
) -> Result<ConnId, NetError> {
    let conn_id = state
        .registry
        .register(tx.clone())
        .map_err(NetError::Registry)?;

    let snapshot = match state.arena.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            state.registry.unregister(conn_id);
            return Err(NetError::Arena(e));
        }
    };
    let msg = ServerMessage::Event(EventDto::State(snapshot.into()));
    let txt = serde_json::to_string(&msg).map_err(NetError::Serialization)?;
    // A full queue here only means broadcasts already got ahead of us.
    let _ = tx.try_send(Utf8Bytes::from(txt));

    // Only the registry's sender stays alive; dropping it ends the loop below.
    drop(tx);
    Ok(conn_id)
}

struct ConnCtx {
    msgs_in: u64,
    msgs_out: u64,
    bytes_out: u64,
    last_ignored_log: Instant,
    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new() -> Self {
        Self {
            msgs_in: 0,
            msgs_out: 0,
            bytes_out: 0,
            last_ignored_log: Instant::now() - LOG_THROTTLE,
            close_frame: None,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(
    socket: &mut WebSocket,
    rx: &mut mpsc::Receiver<Utf8Bytes>,
    ctx: &mut ConnCtx,
) {
    loop {
        let control = tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(bytes) => forward_bytes(socket, bytes, ctx).await,
                None => {
                    // Unregistered elsewhere; nothing more will arrive.
                    ctx.close_frame = Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: "viewer removed".into(),
                    });
                    LoopControl::Disconnect
                }
            },
            incoming = socket.recv() => handle_incoming_ws(incoming, ctx),
        };

        if let LoopControl::Disconnect = control {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await {
                debug!(error = ?err, "socket close error");
            }
            return;
        }
    }
}

// Viewers only listen; anything they send besides control frames is ignored.
fn handle_incoming_ws(incoming: Option<Result<Message, Error>>, ctx: &mut ConnCtx) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                if should_log(&mut ctx.last_ignored_log) {
                    debug!(bytes = text.len(), "ignoring viewer text message");
                }
                LoopControl::Continue
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                LoopControl::Disconnect
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!("websocket closed");
            LoopControl::Disconnect
        }
    }
}

async fn forward_bytes(
    socket: &mut WebSocket,
    bytes: Utf8Bytes,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send to viewer");
            LoopControl::Disconnect
        }
    }
}
