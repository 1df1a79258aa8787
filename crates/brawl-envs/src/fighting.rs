//! Two-fighter ragdoll environment.
//!
//! Each step takes one torque action per fighter, advances the physics by a
//! single timestep and answers from one fighter's point of view (the
//! "side"). The reward is the change in torso separation (positive when the
//! fighters close in) plus the side's scaled hit reward.

use crate::config::FightConfig;
use crate::contacts::{score_contacts, HitReport, HitTable};
use crate::model::{arena_geoms, Fighter, Model, Owner};
use crate::observation::{side_observation, ObservationLayout};
use crate::render::{Camera, Frame, Palette};
use crate::sim::Simulation;
use brawl::env::{Env, EnvInfo, MultiAgentStepResult, StepResult};
use brawl::spaces::Box as BoxSpace;
use brawl::{BrawlError, Result};
use ndarray::ArrayD;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{debug, warn};

const RENDER_COLS: usize = 64;
const RENDER_ROWS: usize = 24;

/// Per-episode diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FightStats {
    /// Unscaled force of every scoring contact
    pub exchanged_hitpower: f32,
    /// Approach plus hit reward of fighter one
    pub cumulated_reward_1: f32,
    pub cumulated_reward_2: f32,
}

impl FightStats {
    fn attach(&self, info: EnvInfo) -> EnvInfo {
        info.with_extra("exchanged_hitpower", self.exchanged_hitpower)
            .with_extra("cumulated_reward_1", self.cumulated_reward_1)
            .with_extra("cumulated_reward_2", self.cumulated_reward_2)
    }
}

/// Rewards of one physics step before they are assigned to a side
struct StepRewards {
    approach: f32,
    hit: [f32; 2],
}

impl StepRewards {
    fn total(&self, fighter: Fighter) -> f32 {
        self.approach + self.hit[fighter.index()]
    }
}

pub struct FightingEnv {
    config: FightConfig,
    palette: Palette,
    model: Model,
    sim: Simulation,
    hits: HitTable,
    layout: ObservationLayout,
    rng: StdRng,
    pending_seed: Option<u64>,

    dist: f32,
    torso_height: f32,
    step_count: u32,
    stats: FightStats,
    last_hits: HitReport,
    camera: Option<Camera>,
}

impl FightingEnv {
    pub fn new(config: FightConfig) -> Result<Self> {
        config.validate()?;
        let palette = Palette::default();
        let model = Model::new(
            &config.humanoid,
            arena_geoms(config.arena_half_extent, config.wall_height),
            &palette,
        )?;
        let hits = HitTable::new(&model, &config.humanoid.strike_geoms)?;
        let mut rng = StdRng::seed_from_u64(0);
        let sim = Simulation::new(&config, &model, &mut rng)?;
        let layout = ObservationLayout::of(&sim);

        let mut env = Self {
            config,
            palette,
            model,
            sim,
            hits,
            layout,
            rng,
            pending_seed: None,
            dist: 0.0,
            torso_height: 0.0,
            step_count: 0,
            stats: FightStats::default(),
            last_hits: HitReport::default(),
            camera: None,
        };
        env.settle();
        debug!(
            actions = env.n_actions(),
            observations = env.n_observations(),
            geoms = env.model.len(),
            "Created fighting env"
        );
        Ok(env)
    }

    /// One zero-control step, then episode bookkeeping from scratch
    fn settle(&mut self) {
        for fighter in Fighter::ALL {
            self.model
                .paint_owned(Owner::Fighter(fighter), self.palette.fighter(fighter));
        }
        self.sim.step();
        self.step_count = 0;
        self.stats = FightStats::default();
        self.last_hits = HitReport::default();
        self.dist = self.torso_distance();
        self.torso_height = self.sim.torso_pose(Fighter::First).position[2];
    }

    fn torso_distance(&self) -> f32 {
        let a = self.sim.torso_pose(Fighter::First).position;
        let b = self.sim.torso_pose(Fighter::Second).position;
        a.iter()
            .zip(&b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }

    /// Rebuild the scene and return the observation for `side`.
    ///
    /// `seed` (or one stored with [`FightingEnv::seed`]) restarts the spawn
    /// noise stream; without one the stream continues.
    pub fn reset_side(&mut self, seed: Option<u64>, side: Fighter) -> Result<ArrayD<f32>> {
        if let Some(seed) = seed.or(self.pending_seed.take()) {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.sim = Simulation::new(&self.config, &self.model, &mut self.rng)?;
        self.settle();
        debug!(side = %side, dist = self.dist, "Reset fighting env");
        Ok(side_observation(&self.sim, side))
    }

    /// Advance one step with fighter one's and fighter two's actions and
    /// answer for `side`.
    pub fn step_fighters(&mut self, a1: &[f32], a2: &[f32], side: Fighter) -> Result<StepResult> {
        let rewards = self.advance(a1, a2)?;
        Ok(StepResult {
            observation: side_observation(&self.sim, side),
            reward: rewards.total(side),
            terminated: false,
            truncated: self.is_done(),
            info: self.info(),
        })
    }

    fn advance(&mut self, a1: &[f32], a2: &[f32]) -> Result<StepRewards> {
        let n = self.n_actions();
        for action in [a1, a2] {
            if action.len() != n {
                return Err(BrawlError::ShapeMismatch {
                    expected: vec![n],
                    actual: vec![action.len()],
                });
            }
        }
        let ctrl: Vec<f32> = a1.iter().chain(a2).copied().collect();
        self.sim.set_ctrl(&ctrl)?;

        self.step_count += 1;
        self.sim.step();
        if !self.sim.is_finite() {
            warn!(step = self.step_count, "Simulation diverged");
            return Err(BrawlError::SimulationDiverged {
                step: self.step_count,
            });
        }

        let new_dist = self.torso_distance();
        let approach = self.dist - new_dist;
        self.dist = new_dist;
        self.torso_height = self.sim.torso_pose(Fighter::First).position[2];

        let hit = self.contact_rewards();
        let rewards = StepRewards { approach, hit };
        self.stats.cumulated_reward_1 += rewards.total(Fighter::First);
        self.stats.cumulated_reward_2 += rewards.total(Fighter::Second);

        if self.step_count == self.config.max_steps {
            debug!(
                steps = self.step_count,
                exchanged_hitpower = self.stats.exchanged_hitpower,
                reward_1 = self.stats.cumulated_reward_1,
                reward_2 = self.stats.cumulated_reward_2,
                "Episode finished"
            );
        }
        Ok(rewards)
    }

    /// Score the current contacts and recolour the fighters.
    ///
    /// Returns the scaled hit reward of each fighter.
    pub fn contact_rewards(&mut self) -> [f32; 2] {
        for fighter in Fighter::ALL {
            self.model
                .paint_owned(Owner::Fighter(fighter), self.palette.fighter(fighter));
        }

        let report = score_contacts(&self.hits, self.sim.contacts(), self.config.hit_scale);
        for &geom in &report.hit_geoms {
            self.model.set_rgba(geom, self.palette.hit);
        }
        self.stats.exchanged_hitpower += report.exchanged;

        let rewards = report.rewards;
        self.last_hits = report;
        rewards
    }

    fn info(&self) -> EnvInfo {
        self.stats
            .attach(EnvInfo::new())
            .with_extra("distance", self.dist)
    }

    /// Store a seed for the next reset
    pub fn seed(&mut self, seed: u64) {
        self.pending_seed = Some(seed);
    }

    /// Snapshot of the current scene for external viewers
    pub fn frame(&self) -> Frame {
        let camera = self
            .camera
            .clone()
            .unwrap_or_else(|| Camera::new(&self.config.camera));
        Frame::capture(self.step_count, &camera, &self.model, &self.sim.geom_poses())
    }

    pub fn stats(&self) -> FightStats {
        self.stats
    }

    /// Contact scoring of the last step
    pub fn last_hits(&self) -> &HitReport {
        &self.last_hits
    }

    pub fn config(&self) -> &FightConfig {
        &self.config
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn hit_table(&self) -> &HitTable {
        &self.hits
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Current torso-to-torso distance
    pub fn distance(&self) -> f32 {
        self.dist
    }

    /// Height of fighter one's torso after the last step
    pub fn torso_height(&self) -> f32 {
        self.torso_height
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Action size per fighter
    pub fn n_actions(&self) -> usize {
        self.sim.ctrl().len() / 2
    }

    /// Size of the side-ordered observation (both fighters)
    pub fn n_observations(&self) -> usize {
        self.layout.total()
    }

    /// Generalised coordinates per fighter
    pub fn n_joints(&self) -> usize {
        self.layout.n_qpos
    }
}

impl Env for FightingEnv {
    fn observation_space(&self) -> BoxSpace {
        BoxSpace::unbounded(&[self.n_observations()])
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::symmetric(&[self.n_actions()])
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        let obs = self.reset_side(seed, Fighter::First)?;
        Ok((obs, self.info()))
    }

    /// `action` is fighter one's action followed by fighter two's; the
    /// result is from fighter one's side.
    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
        let n = self.n_actions();
        let flat: Vec<f32> = action.iter().copied().collect();
        if flat.len() != 2 * n {
            return Err(BrawlError::ShapeMismatch {
                expected: vec![2 * n],
                actual: action.shape().to_vec(),
            });
        }
        let (a1, a2) = flat.split_at(n);
        self.step_fighters(a1, a2, Fighter::First)
    }

    /// Agents `0` and `1` are fighters one and two; each observation is from
    /// that fighter's side.
    fn multi_step(&mut self, actions: &HashMap<u32, ArrayD<f32>>) -> Result<MultiAgentStepResult> {
        let action_of = |id: u32| -> Result<Vec<f32>> {
            actions
                .get(&id)
                .map(|a| a.iter().copied().collect())
                .ok_or_else(|| BrawlError::InvalidAction(format!("missing action for agent {}", id)))
        };
        let a1 = action_of(0)?;
        let a2 = action_of(1)?;
        let rewards = self.advance(&a1, &a2)?;
        let truncated = self.is_done();

        let mut result = MultiAgentStepResult {
            observations: HashMap::with_capacity(2),
            rewards: HashMap::with_capacity(2),
            terminated: HashMap::with_capacity(2),
            truncated: HashMap::with_capacity(2),
            info: self.info(),
        };
        for fighter in Fighter::ALL {
            let id = fighter.index() as u32;
            result
                .observations
                .insert(id, side_observation(&self.sim, fighter));
            result.rewards.insert(id, rewards.total(fighter));
            result.terminated.insert(id, false);
            result.truncated.insert(id, truncated);
        }
        Ok(result)
    }

    fn render(&mut self) -> Option<String> {
        let torso1 = self.sim.torso_pose(Fighter::First).position;
        let torso2 = self.sim.torso_pose(Fighter::Second).position;
        let camera = self
            .camera
            .get_or_insert_with(|| Camera::new(&self.config.camera));
        camera.track(torso1, torso2);

        let frame = self.frame();
        Some(frame.ascii(RENDER_COLS, RENDER_ROWS, &self.palette))
    }

    fn close(&mut self) {
        self.camera = None;
    }

    fn num_agents(&self) -> usize {
        2
    }

    fn is_done(&self) -> bool {
        self.step_count >= self.config.max_steps
    }
}
