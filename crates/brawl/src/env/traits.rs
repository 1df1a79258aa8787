//! Core environment trait definitions.

use crate::spaces::Box as BoxSpace;
use crate::{BrawlError, Result};
use ndarray::ArrayD;
use std::collections::HashMap;

/// Information returned from environment steps
#[derive(Clone, Debug, Default)]
pub struct EnvInfo {
    /// Episode return (if done)
    pub episode_return: Option<f32>,
    /// Episode length (if done)
    pub episode_length: Option<f32>,
    /// Custom metrics
    pub extra: smallvec::SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric, replacing an earlier value under the same key
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        match self.extra.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((key, value)),
        }
        self
    }

    /// Get a value by key (including defaults)
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
        }
    }
}

/// Result from a single environment step
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Observation after the step
    pub observation: ArrayD<f32>,
    /// Reward received
    pub reward: f32,
    /// Whether episode terminated
    pub terminated: bool,
    /// Whether episode truncated (time limit)
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl StepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Result from a multi-agent environment step
#[derive(Clone, Debug)]
pub struct MultiAgentStepResult {
    /// Observations for each agent
    pub observations: HashMap<u32, ArrayD<f32>>,
    /// Rewards for each agent
    pub rewards: HashMap<u32, f32>,
    /// Terminated flags for each agent
    pub terminated: HashMap<u32, bool>,
    /// Truncated flags for each agent
    pub truncated: HashMap<u32, bool>,
    /// Additional info
    pub info: EnvInfo,
}

impl MultiAgentStepResult {
    /// Check if every agent is done
    pub fn all_done(&self) -> bool {
        self.terminated
            .keys()
            .all(|id| self.terminated[id] || self.truncated.get(id).copied().unwrap_or(false))
    }
}

/// Core trait for environments driven by an external training loop.
///
/// # Example
///
/// ```rust,ignore
/// use brawl::env::{Env, EnvInfo, StepResult};
/// use brawl::spaces::Box as BoxSpace;
///
/// struct Drift {
///     x: f32,
/// }
///
/// impl Env for Drift {
///     fn observation_space(&self) -> BoxSpace {
///         BoxSpace::unbounded(&[1])
///     }
///
///     fn action_space(&self) -> BoxSpace {
///         BoxSpace::symmetric(&[1])
///     }
///
///     fn reset(&mut self, _seed: Option<u64>) -> brawl::Result<(ArrayD<f32>, EnvInfo)> {
///         self.x = 0.0;
///         Ok((ArrayD::from_elem(IxDyn(&[1]), self.x), EnvInfo::new()))
///     }
///
///     fn step(&mut self, action: &ArrayD<f32>) -> brawl::Result<StepResult> {
///         // ... implement step logic
///     }
/// }
/// ```
pub trait Env: Send {
    /// Get the observation space
    fn observation_space(&self) -> BoxSpace;

    /// Get the action space
    fn action_space(&self) -> BoxSpace;

    /// Reset the environment to its initial state
    ///
    /// # Arguments
    /// * `seed` - Optional random seed for reproducibility
    ///
    /// # Returns
    /// Tuple of (initial observation, info)
    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)>;

    /// Take a single step in the environment
    ///
    /// # Arguments
    /// * `action` - Action to execute
    ///
    /// # Returns
    /// StepResult containing observation, reward, done flags, and info
    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult>;

    /// Optional: Take a multi-agent step
    ///
    /// # Arguments
    /// * `actions` - Map of agent ID to action
    fn multi_step(&mut self, _actions: &HashMap<u32, ArrayD<f32>>) -> Result<MultiAgentStepResult> {
        Err(BrawlError::EnvError(
            "multi_step not supported by this environment".to_string(),
        ))
    }

    /// Optional: Render the environment
    fn render(&mut self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}

    /// Get total number of agents
    fn num_agents(&self) -> usize {
        1
    }

    /// Check if environment is done and needs reset
    fn is_done(&self) -> bool {
        false
    }
}
