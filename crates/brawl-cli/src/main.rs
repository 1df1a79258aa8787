//! Brawl CLI
//!
//! Command-line interface for running and inspecting the fighting environment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ndarray::{Array1, ArrayD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use brawl::env::{Env, EpisodeStats};
use brawl::log::{CompositeLogger, ConsoleLogger, MetricLogger};
use brawl::utils::StepTimer;
use brawl::BrawlError;
use brawl_envs::{FightConfig, FightingEnv, Fighter, Owner};

#[derive(Parser)]
#[command(name = "brawl")]
#[command(version, about = "Brawl - two-fighter ragdoll environment", long_about = None)]
struct Cli {
    /// Environment config file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the episode length from the config
    #[arg(long, global = true)]
    max_steps: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Demo: random actions for both fighters with an ASCII view
    Demo {
        /// Number of steps
        #[arg(long, default_value = "200")]
        steps: usize,

        /// Seed for actions and resets
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Render every N steps (0 disables)
        #[arg(long, default_value = "50")]
        render_every: usize,

        /// Write one JSON frame per step to this file
        #[arg(long)]
        frames: Option<PathBuf>,
    },

    /// Evaluate a random policy
    Eval {
        /// Number of episodes
        #[arg(long, default_value = "3")]
        episodes: usize,

        /// Seed for actions and resets
        #[arg(long, default_value = "0")]
        seed: u64,

        /// TensorBoard log directory (requires --features tensorboard)
        #[arg(long)]
        logdir: Option<PathBuf>,
    },

    /// Show space sizes and the geom table
    Info,

    /// Print the effective config
    Config {
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ConfigFormat {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.max_steps)?;

    match cli.command {
        Commands::Demo {
            steps,
            seed,
            render_every,
            frames,
        } => demo(config, steps, seed, render_every, frames.as_deref())?,
        Commands::Eval {
            episodes,
            seed,
            logdir,
        } => eval(config, episodes, seed, logdir.as_deref())?,
        Commands::Info => info(config)?,
        Commands::Config { format } => {
            let text = match format {
                ConfigFormat::Json => config.to_json()?,
                ConfigFormat::Yaml => config.to_yaml()?,
            };
            println!("{}", text.trim_end());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, max_steps: Option<u32>) -> Result<FightConfig> {
    let mut config = match path {
        Some(path) => FightConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => FightConfig::default(),
    };
    if let Some(max_steps) = max_steps {
        config = config.with_max_steps(max_steps);
        config.validate()?;
    }
    Ok(config)
}

fn random_action(rng: &mut StdRng, len: usize) -> ArrayD<f32> {
    let values: Vec<f32> = (0..len).map(|_| StandardNormal.sample(&mut *rng)).collect();
    Array1::from_vec(values).into_dyn()
}

fn demo(
    config: FightConfig,
    steps: usize,
    seed: u64,
    render_every: usize,
    frames: Option<&Path>,
) -> Result<()> {
    tracing::info!(steps, seed, render_every, "Running demo");

    let mut env = FightingEnv::new(config)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let action_len = 2 * env.n_actions();
    let mut frames = match frames {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => None,
    };

    env.reset(Some(seed))?;
    for step in 0..steps {
        let action = random_action(&mut rng, action_len);
        let result = match env.step(&action) {
            Ok(result) => result,
            Err(BrawlError::SimulationDiverged { step: at }) => {
                tracing::warn!(step, at, "Simulation diverged, resetting");
                env.reset(None)?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if render_every > 0 && step % render_every == 0 {
            if let Some(view) = env.render() {
                println!("{}", view);
            }
        }
        if let Some(out) = frames.as_mut() {
            serde_json::to_writer(&mut *out, &env.frame())?;
            out.write_all(b"\n")?;
        }

        if result.done() {
            let stats = env.stats();
            tracing::info!(
                step,
                exchanged_hitpower = stats.exchanged_hitpower,
                reward_1 = stats.cumulated_reward_1,
                reward_2 = stats.cumulated_reward_2,
                "Episode ended, resetting"
            );
            env.reset(None)?;
        }
    }

    if let Some(mut out) = frames {
        out.flush()?;
    }
    env.close();
    Ok(())
}

fn eval(config: FightConfig, episodes: usize, seed: u64, logdir: Option<&Path>) -> Result<()> {
    tracing::info!(episodes, seed, "Starting evaluation (random policy)");

    #[cfg_attr(not(feature = "tensorboard"), allow(unused_mut))]
    let mut logger = CompositeLogger::new(vec![Box::new(ConsoleLogger::new())]);
    match logdir {
        #[cfg(feature = "tensorboard")]
        Some(dir) => logger.add(Box::new(brawl::log::TensorBoardLogger::new(dir)?)),
        #[cfg(not(feature = "tensorboard"))]
        Some(dir) => tracing::warn!(
            logdir = %dir.display(),
            "TensorBoard logging requires the 'tensorboard' feature"
        ),
        None => {}
    }

    let mut env = EpisodeStats::new(FightingEnv::new(config)?);
    let mut rng = StdRng::seed_from_u64(seed);
    let action_len = 2 * env.inner().n_actions();

    let mut timer = StepTimer::new();
    let mut total_hitpower = 0.0f64;
    let mut diverged = 0usize;

    for episode in 0..episodes {
        env.reset(Some(seed + episode as u64))?;
        loop {
            let action = random_action(&mut rng, action_len);
            let result = match env.step(&action) {
                Ok(result) => result,
                Err(BrawlError::SimulationDiverged { step }) => {
                    tracing::warn!(episode, step, "Simulation diverged, skipping episode");
                    diverged += 1;
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            timer.tick();
            if !result.done() {
                continue;
            }

            let stats = env.inner().stats();
            total_hitpower += stats.exchanged_hitpower as f64;
            let metrics: HashMap<String, f64> = [
                ("episode_return", result.info.get("episode_return").unwrap_or(0.0)),
                ("episode_length", result.info.get("episode_length").unwrap_or(0.0)),
                ("exchanged_hitpower", stats.exchanged_hitpower),
                ("cumulated_reward_1", stats.cumulated_reward_1),
                ("cumulated_reward_2", stats.cumulated_reward_2),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v as f64))
            .collect();
            logger.log_metrics(&metrics, episode as u64);
            break;
        }
    }
    logger.close();

    tracing::info!(
        run = %timer.summary(),
        mean_hitpower = total_hitpower / (episodes - diverged).max(1) as f64,
        diverged,
        "Evaluation complete"
    );
    Ok(())
}

fn info(config: FightConfig) -> Result<()> {
    let env = FightingEnv::new(config)?;
    let table = env.hit_table();

    println!("Actions per fighter:   {}", env.n_actions());
    println!("Observation size:      {}", env.n_observations());
    println!("Joints per fighter:    {}", env.n_joints());
    println!();
    println!("{:<20} {:<10} role", "geom", "owner");
    for (id, geom) in env.model().iter() {
        let (owner, role) = match geom.owner {
            Owner::Fighter(fighter) => {
                let role = if table.is_striker(fighter, id) {
                    "strike, target"
                } else {
                    "target"
                };
                (fighter.to_string(), role)
            }
            Owner::Arena => ("arena".to_string(), "-"),
        };
        println!("{:<20} {:<10} {}", geom.name, owner, role);
    }

    let strikes = env
        .model()
        .owned_by(Owner::Fighter(Fighter::First))
        .filter(|&id| table.is_striker(Fighter::First, id))
        .count();
    println!();
    println!("Strike geoms per fighter: {}", strikes);
    Ok(())
}
