//! Environment traits and wrappers.
//!
//! Provides the core `Env` trait that environments implement,
//! plus wrappers for episode statistics and action clipping.

mod traits;
mod wrappers;

pub use traits::{Env, EnvInfo, MultiAgentStepResult, StepResult};
pub use wrappers::{ClipAction, EpisodeStats};
