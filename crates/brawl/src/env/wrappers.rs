//! Environment wrappers for common functionality.

use super::{EnvInfo, Env, MultiAgentStepResult, StepResult};
use crate::spaces::Box as BoxSpace;
use crate::Result;
use ndarray::ArrayD;
use std::collections::HashMap;

/// Wrapper that tracks episode statistics (return and length).
///
/// Adds `episode_return` and `episode_length` to info on episode completion.
/// For multi-agent steps the return follows agent 0.
pub struct EpisodeStats<E: Env> {
    env: E,
    episode_return: f32,
    episode_length: u32,
}

impl<E: Env> EpisodeStats<E> {
    /// Wrap an environment with episode statistics tracking
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode_return: 0.0,
            episode_length: 0,
        }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Get a mutable reference to the inner environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn record(&mut self, reward: f32, done: bool, info: EnvInfo) -> EnvInfo {
        self.episode_return += reward;
        self.episode_length += 1;

        if !done {
            return info;
        }

        let info = info.with_episode_stats(self.episode_return, self.episode_length);
        // Counters restart here; the env itself is reset externally
        self.episode_return = 0.0;
        self.episode_length = 0;
        info
    }
}

impl<E: Env> Env for EpisodeStats<E> {
    fn observation_space(&self) -> BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
        let mut result = self.env.step(action)?;
        let done = result.done();
        result.info = self.record(result.reward, done, std::mem::take(&mut result.info));
        Ok(result)
    }

    fn multi_step(&mut self, actions: &HashMap<u32, ArrayD<f32>>) -> Result<MultiAgentStepResult> {
        let mut result = self.env.multi_step(actions)?;
        let reward = result.rewards.get(&0).copied().unwrap_or(0.0);
        let done = result.all_done();
        result.info = self.record(reward, done, std::mem::take(&mut result.info));
        Ok(result)
    }

    fn render(&mut self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }

    fn num_agents(&self) -> usize {
        self.env.num_agents()
    }

    fn is_done(&self) -> bool {
        self.env.is_done()
    }
}

/// Wrapper that clips continuous actions to the action space bounds.
///
/// `step` accepts either one agent's action or all agents' actions
/// concatenated; the bounds are tiled to match.
pub struct ClipAction<E: Env> {
    env: E,
    space: BoxSpace,
    low: Vec<f32>,
    high: Vec<f32>,
}

impl<E: Env> ClipAction<E> {
    /// Wrap an environment with action clipping
    pub fn new(env: E) -> Self {
        let space = env.action_space();
        let low = space.low.iter().copied().collect();
        let high = space.high.iter().copied().collect();
        Self {
            env,
            space,
            low,
            high,
        }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Get a mutable reference to the inner environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn clip_tiled(&self, action: &ArrayD<f32>) -> ArrayD<f32> {
        let width = self.low.len().max(1);
        let mut clipped = action.clone();
        for (i, a) in clipped.iter_mut().enumerate() {
            let j = i % width;
            if let (Some(&l), Some(&h)) = (self.low.get(j), self.high.get(j)) {
                *a = a.max(l).min(h);
            }
        }
        clipped
    }
}

impl<E: Env> Env for ClipAction<E> {
    fn observation_space(&self) -> BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        self.env.reset(seed)
    }

    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
        let clipped = self.clip_tiled(action);
        self.env.step(&clipped)
    }

    fn multi_step(&mut self, actions: &HashMap<u32, ArrayD<f32>>) -> Result<MultiAgentStepResult> {
        let clipped = actions
            .iter()
            .map(|(&id, a)| Ok((id, self.space.clip(a)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        self.env.multi_step(&clipped)
    }

    fn render(&mut self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }

    fn num_agents(&self) -> usize {
        self.env.num_agents()
    }

    fn is_done(&self) -> bool {
        self.env.is_done()
    }
}
