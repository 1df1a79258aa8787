//! Per-fighter observation vectors.

use crate::model::Fighter;
use crate::sim::Simulation;
use ndarray::{Array1, ArrayD};

/// Sizes derived from the simulation state layout
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObservationLayout {
    /// Generalised coordinates per fighter
    pub n_qpos: usize,
    /// Generalised velocities per fighter
    pub n_qvel: usize,
}

impl ObservationLayout {
    pub fn of(sim: &Simulation) -> Self {
        Self {
            n_qpos: sim.qpos().len() / 2,
            n_qvel: sim.qvel().len() / 2,
        }
    }

    /// Length of one fighter's observation
    pub fn per_fighter(&self) -> usize {
        self.n_qpos + self.n_qvel + 3 + 4
    }

    /// Length of the env-level observation (own followed by opponent)
    pub fn total(&self) -> usize {
        2 * self.per_fighter()
    }
}

/// `qpos half ++ qvel half ++ torso position ++ torso quaternion`
pub fn fighter_observation(sim: &Simulation, fighter: Fighter) -> Vec<f32> {
    let mut obs = Vec::new();
    push_fighter(&mut obs, sim, &sim.qpos(), &sim.qvel(), fighter);
    obs
}

/// Both fighters' observations with `side` first
pub fn side_observation(sim: &Simulation, side: Fighter) -> ArrayD<f32> {
    let (qpos, qvel) = (sim.qpos(), sim.qvel());
    let mut obs = Vec::with_capacity(qpos.len() + qvel.len() + 14);
    push_fighter(&mut obs, sim, &qpos, &qvel, side);
    push_fighter(&mut obs, sim, &qpos, &qvel, side.other());
    Array1::from_vec(obs).into_dyn()
}

fn push_fighter(obs: &mut Vec<f32>, sim: &Simulation, qpos: &[f32], qvel: &[f32], fighter: Fighter) {
    let (np, nv) = (qpos.len() / 2, qvel.len() / 2);
    let f = fighter.index();
    let torso = sim.torso_pose(fighter);
    obs.extend_from_slice(&qpos[f * np..(f + 1) * np]);
    obs.extend_from_slice(&qvel[f * nv..(f + 1) * nv]);
    obs.extend_from_slice(&torso.position);
    obs.extend_from_slice(&torso.quaternion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FightConfig;
    use crate::model::{arena_geoms, Model};
    use crate::render::Palette;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sim() -> Simulation {
        let config = FightConfig::default();
        let model = Model::new(
            &config.humanoid,
            arena_geoms(config.arena_half_extent, config.wall_height),
            &Palette::default(),
        )
        .unwrap();
        Simulation::new(&config, &model, &mut StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn test_layout() {
        let sim = sim();
        let layout = ObservationLayout::of(&sim);
        assert_eq!(layout.n_qpos, 28);
        assert_eq!(layout.n_qvel, 27);
        assert_eq!(layout.per_fighter(), 62);
        assert_eq!(layout.total(), 124);
        assert_eq!(fighter_observation(&sim, Fighter::Second).len(), 62);
    }

    #[test]
    fn test_side_order_swaps_halves() {
        let sim = sim();
        let first = side_observation(&sim, Fighter::First);
        let second = side_observation(&sim, Fighter::Second);
        let first = first.as_slice().unwrap();
        let second = second.as_slice().unwrap();

        assert_eq!(&first[..62], &second[62..]);
        assert_eq!(&first[62..], &second[..62]);
        // root x of each fighter leads its half
        assert!(first[0] < 0.0);
        assert!(second[0] > 0.0);
    }

    #[test]
    fn test_torso_pose_tail() {
        let sim = sim();
        let obs = fighter_observation(&sim, Fighter::First);
        let pose = sim.torso_pose(Fighter::First);
        assert_eq!(&obs[55..58], &pose.position);
        assert_eq!(&obs[58..], &pose.quaternion);
    }

    #[test]
    fn test_side_observation_matches_per_fighter() {
        let sim = sim();
        let side = side_observation(&sim, Fighter::Second);
        let mut expected = fighter_observation(&sim, Fighter::Second);
        expected.extend(fighter_observation(&sim, Fighter::First));
        assert_eq!(side.as_slice().unwrap(), expected.as_slice());
    }
}
