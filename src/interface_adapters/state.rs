use crate::domain::ports::Clock;
use crate::interface_adapters::registry::ConnectionRegistry;
use crate::use_cases::ArenaHandle;

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Clone)]
pub struct AppState {
    // Live viewer channels fed by the broadcast serializer.
    pub registry: Arc<ConnectionRegistry>,
    // Command side of the single arena task.
    pub arena: ArenaHandle,
    // Wall clock for response timestamps.
    pub clock: Arc<dyn Clock>,
    // Queue depth for each viewer's outbound messages.
    pub viewer_channel_capacity: usize,
}

// System clock adapter; milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
