// Interface adapters: wire protocol, viewer registry and network handling.

pub mod http;
pub mod net;
pub mod protocol;
pub mod registry;
pub mod state;
