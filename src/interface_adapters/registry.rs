// Live viewer channels and best-effort fan-out to all of them.

use crate::domain::ports::Clock;
use crate::interface_adapters::protocol::ServerMessage;

use axum::extract::ws::Utf8Bytes;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

pub type ConnId = u64;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
    // The ack could not be queued, so the viewer is not registered.
    #[error("viewer channel closed before registration")]
    ChannelClosed,
    #[error("viewer channel full before registration")]
    ChannelFull,
}

/// What happened to one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    // Slow viewers whose queue was full; they stay registered.
    pub skipped: usize,
    // Viewers whose receiver was gone; they were removed.
    pub pruned: usize,
}

/// Tracks viewer channels; each feeds one socket task's bounded queue.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    channels: Mutex<HashMap<ConnId, mpsc::Sender<Utf8Bytes>>>,
    clock: Arc<dyn Clock>,
}

impl ConnectionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Adds a viewer channel and queues the `connected` ack for it alone.
    pub fn register(&self, tx: mpsc::Sender<Utf8Bytes>) -> Result<ConnId, RegistryError> {
        let ack = encode(&ServerMessage::connected(self.clock.now_millis()))?;
        tx.try_send(ack).map_err(|err| match err {
            TrySendError::Full(_) => RegistryError::ChannelFull,
            TrySendError::Closed(_) => RegistryError::ChannelClosed,
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, tx);
        Ok(id)
    }

    /// Removes a viewer; returns false if it was already gone.
    pub fn unregister(&self, id: ConnId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Serializes once and offers the bytes to every live channel.
    pub fn broadcast(&self, msg: &ServerMessage) -> Result<BroadcastReport, RegistryError> {
        let bytes = encode(msg)?;
        Ok(self.broadcast_bytes(bytes))
    }

    pub fn broadcast_bytes(&self, bytes: Utf8Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        // try_send never waits, so one slow viewer cannot stall the rest.
        self.lock()
            .retain(|id, tx| match tx.try_send(bytes.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    debug!(conn_id = *id, "viewer queue full; message skipped");
                    report.skipped += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn_id = *id, "viewer channel closed; pruned");
                    report.pruned += 1;
                    false
                }
            });
        report
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnId, mpsc::Sender<Utf8Bytes>>> {
        // The map stays consistent even if a holder panicked.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn encode(msg: &ServerMessage) -> Result<Utf8Bytes, RegistryError> {
    let txt = serde_json::to_string(msg)?;
    Ok(Utf8Bytes::from(txt))
}
