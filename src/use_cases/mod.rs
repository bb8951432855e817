// Use cases layer: the arena pipeline from interaction to published update.

pub mod arena;
pub mod normalizer;
pub mod types;

pub use arena::{ArenaError, ArenaHandle, ArenaSession, ArenaSettings};
pub use normalizer::normalize;
pub use types::{
    ActivationAttempt, ArenaCommand, ArenaUpdate, InteractionEvent, NormalizedEvent, RoundReport,
    Viewer,
};
