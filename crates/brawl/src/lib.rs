//! # Brawl
//!
//! Environment plumbing for two-fighter ragdoll reinforcement learning.
//!
//! ## Overview
//!
//! This crate provides:
//! - The `Env` trait consumed by external training loops (single and multi-agent steps)
//! - `Box` observation/action spaces
//! - Wrappers for episode statistics and action clipping
//! - Metric logging backends (console, composite, optional TensorBoard)
//!
//! The fighting environment itself lives in `brawl-envs`.
//!
//! ## Features
//!
//! - `default` - Core functionality
//! - `tensorboard` - Enable the TensorBoard metric logger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brawl::prelude::*;
//! use brawl_envs::{FightConfig, FightingEnv};
//!
//! let mut env = FightingEnv::new(FightConfig::default())?;
//! let (obs, _) = env.reset(Some(42))?;
//!
//! let action = ArrayD::zeros(IxDyn(&[env.action_space().shape()[0] * 2]));
//! let result = env.step(&action)?;
//! ```

pub mod env;
pub mod log;
pub mod spaces;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::env::{ClipAction, EnvInfo, EpisodeStats, Env, MultiAgentStepResult, StepResult};
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
    #[cfg(feature = "tensorboard")]
    pub use crate::log::TensorBoardLogger;
    pub use crate::spaces::{Box as BoxSpace, Space};
    pub use crate::{BrawlError, Result};
    pub use ndarray::{ArrayD, IxDyn};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum BrawlError {
    #[error("Environment error: {0}")]
    EnvError(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("Simulation diverged at step {step}")]
    SimulationDiverged { step: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, BrawlError>;
