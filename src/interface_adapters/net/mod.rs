// Network adapter modules split by viewer sockets vs webhook/controller HTTP routes.

pub mod client;
pub mod internal;

pub use client::{spawn_update_serializer, ws_handler};
pub use internal::{arena_reset_handler, arena_state_handler, webhook_event_handler, webhook_status_handler};
