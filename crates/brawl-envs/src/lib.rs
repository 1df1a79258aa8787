//! Two-fighter humanoid ragdoll environment.
//!
//! Two ragdolls stand in a walled arena simulated with `rapier3d`. Each step
//! takes one joint-torque action per fighter and rewards approaching the
//! opponent and landing hits with hands and feet.
//!
//! - `FightingEnv` - the environment, implementing `brawl::env::Env`
//! - `FightConfig` - physics, reward and humanoid settings (JSON/YAML)
//! - `model` - humanoid description and geom table
//! - `render` - camera tracking and renderable frames

pub mod config;
pub mod contacts;
mod fighting;
pub mod model;
pub mod observation;
pub mod render;
pub mod sim;

pub use config::{CameraConfig, FightConfig};
pub use contacts::{score_contacts, HitReport, HitTable};
pub use fighting::{FightStats, FightingEnv};
pub use model::{Fighter, GeomId, HumanoidSpec, Model, Owner};
pub use render::{Camera, Frame, Palette};
pub use sim::{Contact, Pose, Simulation};
