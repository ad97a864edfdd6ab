//! The simulated conscious mind.
//!
//! Everything here is synchronous state plus one async edge (the provider
//! call). Channels share a single [`Mind`] through [`SharedMind`]; the mutex
//! serializes overlapping turns and dreams.

pub mod dream;
pub mod history;
pub mod monologue;
pub mod prompt;
pub mod report;
pub mod sampler;
pub mod service;
pub mod state;
pub mod templates;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use dream::{Dream, DreamInfluence, DreamOutcome, DreamSource};
pub use report::{ConsciousnessReport, StateSample};
pub use service::{Mind, Reply};
pub use state::{AiState, ChoiceReasoning, Mood, PersonalityTraits, ValueKind};

pub type SharedMind = Arc<Mutex<Mind>>;

pub fn shared(mind: Mind) -> SharedMind {
    Arc::new(Mutex::new(mind))
}
