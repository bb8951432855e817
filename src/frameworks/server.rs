// Framework bootstrap for the arena server runtime.

use crate::domain::ArenaTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{
    arena_reset_handler, arena_state_handler, spawn_update_serializer, webhook_event_handler,
    webhook_status_handler, ws_handler,
};
use crate::interface_adapters::registry::ConnectionRegistry;
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::{ArenaHandle, ArenaSession, ArenaSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

pub fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    // try_init: a second call (tests, embedding) keeps the first subscriber.
    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };
    if installed.is_err() {
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route(
            "/webhook/events",
            post(webhook_event_handler).get(webhook_status_handler),
        )
        .route("/arena/state", get(arena_state_handler))
        .route("/arena/reset", post(arena_reset_handler))
        .with_state(state)
}

/// Serves the arena on an already-bound listener with default tuning.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, ArenaTuning::default()).await
}

pub async fn serve(listener: tokio::net::TcpListener, tuning: ArenaTuning) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(tuning)?;
    let app = router(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let tuning = config::load_tuning().inspect_err(|e| {
        tracing::error!(error = %e, "failed to load tuning");
    })?;
    let address = SocketAddr::new(config::bind_addr(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    serve(listener, tuning).await
}

/// Spawns the arena task and its serializer and wires the shared state.
///
/// Must be called inside a tokio runtime.
pub fn build_state(tuning: ArenaTuning) -> Result<Arc<AppState>> {
    tuning.validate().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid tuning: {e}"))
    })?;
    tracing::debug!(
        enemy = %tuning.enemy.name,
        enemy_hp = tuning.enemy.hp,
        trigger_case = ?tuning.trigger_case,
        strike_interval_ms = tuning.enemy_strike_interval_ms,
        "arena tuning"
    );

    let clock = Arc::new(SystemClock);
    let registry = Arc::new(ConnectionRegistry::new(clock.clone()));

    // The arena task exclusively owns combat and cooldown state.
    let arena = ArenaHandle::spawn(
        ArenaSession::new(tuning),
        SystemClock,
        &ArenaSettings {
            command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
            update_broadcast_capacity: config::UPDATE_BROADCAST_CAPACITY,
        },
    );
    spawn_update_serializer(&arena, registry.clone());

    Ok(Arc::new(AppState {
        registry,
        arena,
        clock,
        viewer_channel_capacity: config::VIEWER_CHANNEL_CAPACITY,
    }))
}
