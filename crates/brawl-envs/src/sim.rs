//! Rigid-body simulation of the arena and both fighters.

use crate::config::FightConfig;
use crate::model::{Axis, Fighter, GeomId, GeomShape, HumanoidSpec, Model, Owner};
use brawl::{BrawlError, Result};
use rand::Rng;
use rapier3d::na::{point, vector, Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use serde::Serialize;
use std::f32::consts::PI;
use tracing::debug;

const FIGHTER_GROUPS: [Group; 2] = [Group::GROUP_1, Group::GROUP_2];
const ARENA_GROUP: Group = Group::GROUP_3;

/// A touching contact point between two geoms
#[derive(Clone, Debug, PartialEq)]
pub struct Contact {
    pub geom1: GeomId,
    pub geom2: GeomId,
    /// Normal force, `None` when the solver produced no constraint for the point
    pub force: Option<f32>,
    pub position: [f32; 3],
}

/// World pose; quaternion is (w, x, y, z)
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub quaternion: [f32; 4],
}

impl Pose {
    fn from_isometry(iso: &Isometry3<f32>) -> Self {
        let t = iso.translation.vector;
        let q = iso.rotation;
        Self {
            position: [t.x, t.y, t.z],
            quaternion: [q.w, q.i, q.j, q.k],
        }
    }
}

struct Actuator {
    parent: RigidBodyHandle,
    child: RigidBodyHandle,
    axis: Axis,
    gear: f32,
}

struct FighterBodies {
    bodies: Vec<RigidBodyHandle>,
    actuators: Vec<Actuator>,
}

pub struct Simulation {
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    fighters: [FighterBodies; 2],
    body_names: Vec<String>,
    torso_body: usize,
    /// Indexed by `GeomId`
    geom_colliders: Vec<ColliderHandle>,
    ctrl: Vec<f32>,
    ctrl_range: f32,
    gear_scale: f32,
    contacts: Vec<Contact>,
    steps: u32,
}

impl Simulation {
    /// Build the arena and both fighters at their spawn poses.
    ///
    /// `rng` is only drawn from when `init_noise` is positive.
    pub fn new<R: Rng>(config: &FightConfig, model: &Model, rng: &mut R) -> Result<Self> {
        let humanoid = &config.humanoid;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;
        integration_parameters.num_solver_iterations = config.solver_iterations;

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut impulse_joints = ImpulseJointSet::new();

        let fighters = Fighter::ALL.map(|fighter| {
            let origin = spawn_origin(config, fighter, &mut *rng);
            build_fighter(humanoid, origin, &mut bodies, &mut impulse_joints)
        });
        let arena = bodies.insert(RigidBodyBuilder::fixed().build());

        let mut geom_colliders = Vec::with_capacity(model.len());
        for (id, geom) in model.iter() {
            let (parent, groups) = match (geom.owner, geom.body) {
                (Owner::Fighter(fighter), Some(body)) => {
                    let own = FIGHTER_GROUPS[fighter.index()];
                    let mut filter = FIGHTER_GROUPS[fighter.other().index()] | ARENA_GROUP;
                    if config.self_collisions {
                        filter |= own;
                    }
                    (fighters[fighter.index()].bodies[body], (own, filter))
                }
                (Owner::Arena, _) => (
                    arena,
                    (ARENA_GROUP, FIGHTER_GROUPS[0] | FIGHTER_GROUPS[1]),
                ),
                (Owner::Fighter(_), None) => {
                    return Err(BrawlError::EnvError(format!(
                        "fighter geom '{}' is not attached to a body",
                        geom.name
                    )))
                }
            };
            let collider = collider_builder(&geom.shape)
                .density(humanoid.density)
                .friction(humanoid.friction)
                .user_data(id.0 as u128)
                .collision_groups(InteractionGroups::new(
                    groups.0,
                    groups.1,
                    InteractionTestMode::And,
                ))
                .build();
            geom_colliders.push(colliders.insert_with_parent(collider, parent, &mut bodies));
        }

        debug!(
            bodies = bodies.len(),
            colliders = colliders.len(),
            joints = impulse_joints.len(),
            "Built simulation"
        );

        let n_ctrl = 2 * model.actuators_per_fighter();
        Ok(Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0, config.gravity],
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints,
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            fighters,
            body_names: humanoid.bodies.iter().map(|b| b.name.clone()).collect(),
            torso_body: model.torso_body(),
            geom_colliders,
            ctrl: vec![0.0; n_ctrl],
            ctrl_range: config.ctrl_range,
            gear_scale: config.gear_scale,
            contacts: Vec::new(),
            steps: 0,
        })
    }

    /// Set the controls for both fighters, fighter one first.
    pub fn set_ctrl(&mut self, ctrl: &[f32]) -> Result<()> {
        if ctrl.len() != self.ctrl.len() {
            return Err(BrawlError::ShapeMismatch {
                expected: vec![self.ctrl.len()],
                actual: vec![ctrl.len()],
            });
        }
        if let Some(i) = ctrl.iter().position(|c| !c.is_finite()) {
            return Err(BrawlError::InvalidAction(format!(
                "control {} is {}",
                i, ctrl[i]
            )));
        }
        let range = self.ctrl_range;
        for (dst, &src) in self.ctrl.iter_mut().zip(ctrl) {
            *dst = src.clamp(-range, range);
        }
        Ok(())
    }

    pub fn ctrl(&self) -> &[f32] {
        &self.ctrl
    }

    /// Apply the current controls and advance one timestep.
    pub fn step(&mut self) {
        self.apply_torques();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.steps += 1;
        self.collect_contacts();
    }

    fn apply_torques(&mut self) {
        for fighter in &self.fighters {
            for &handle in &fighter.bodies {
                self.bodies[handle].reset_torques(true);
            }
        }

        let n = self.ctrl.len() / 2;
        for (f, fighter) in self.fighters.iter().enumerate() {
            for (k, act) in fighter.actuators.iter().enumerate() {
                let magnitude = self.ctrl[f * n + k] * act.gear * self.gear_scale;
                let axis = self.bodies[act.parent].rotation() * Vector3::from(act.axis.unit());
                let torque = axis * magnitude;
                self.bodies[act.child].add_torque(torque, true);
                self.bodies[act.parent].add_torque(-torque, true);
            }
        }
    }

    fn collect_contacts(&mut self) {
        let dt = self.integration_parameters.dt;
        self.contacts.clear();

        for pair in self.narrow_phase.contact_pairs() {
            let (Some(c1), Some(c2)) = (
                self.colliders.get(pair.collider1),
                self.colliders.get(pair.collider2),
            ) else {
                continue;
            };
            let geom1 = GeomId(c1.user_data as usize);
            let geom2 = GeomId(c2.user_data as usize);

            for manifold in &pair.manifolds {
                let solved = !manifold.data.solver_contacts.is_empty();
                for point in &manifold.points {
                    if point.dist > 0.0 {
                        continue;
                    }
                    let world = c1.position() * point.local_p1;
                    self.contacts.push(Contact {
                        geom1,
                        geom2,
                        force: solved.then(|| point.data.impulse / dt),
                        position: [world.x, world.y, world.z],
                    });
                }
            }
        }
    }

    /// Touching contacts found by the last step
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Per fighter: root position, root quaternion (w, x, y, z), joint angles.
    pub fn qpos(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(2 * (7 + self.ctrl.len() / 2));
        for fighter in &self.fighters {
            let root = &self.bodies[fighter.bodies[0]];
            let t = root.translation();
            let q = root.rotation();
            out.extend_from_slice(&[t.x, t.y, t.z, q.w, q.i, q.j, q.k]);
            for act in &fighter.actuators {
                let parent = self.bodies[act.parent].rotation();
                let child = self.bodies[act.child].rotation();
                let relative = parent.inverse() * child;
                out.push(relative.scaled_axis()[act.axis.index()]);
            }
        }
        out
    }

    /// Per fighter: root linear velocity, root angular velocity, joint rates.
    pub fn qvel(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(2 * (6 + self.ctrl.len() / 2));
        for fighter in &self.fighters {
            let root = &self.bodies[fighter.bodies[0]];
            let v = root.linvel();
            let w = root.angvel();
            out.extend_from_slice(&[v.x, v.y, v.z, w.x, w.y, w.z]);
            for act in &fighter.actuators {
                let parent = &self.bodies[act.parent];
                let child = &self.bodies[act.child];
                let rate = parent.rotation().inverse() * (child.angvel() - parent.angvel());
                out.push(rate[act.axis.index()]);
            }
        }
        out
    }

    /// World pose of a named humanoid body
    pub fn body_pose(&self, fighter: Fighter, body: &str) -> Result<Pose> {
        let index = self
            .body_names
            .iter()
            .position(|name| name == body)
            .ok_or_else(|| BrawlError::UnknownName {
                kind: "body",
                name: body.to_string(),
            })?;
        Ok(self.pose_of(fighter, index))
    }

    pub fn torso_pose(&self, fighter: Fighter) -> Pose {
        self.pose_of(fighter, self.torso_body)
    }

    fn pose_of(&self, fighter: Fighter, index: usize) -> Pose {
        let handle = self.fighters[fighter.index()].bodies[index];
        Pose::from_isometry(self.bodies[handle].position())
    }

    /// Pose of the frame each geom's shape is expressed in, indexed by `GeomId`
    pub fn geom_poses(&self) -> Vec<Pose> {
        self.geom_colliders
            .iter()
            .map(|&handle| {
                let parent = self.colliders[handle].parent();
                match parent.and_then(|p| self.bodies.get(p)) {
                    Some(body) => Pose::from_isometry(body.position()),
                    None => Pose::from_isometry(&Isometry3::identity()),
                }
            })
            .collect()
    }

    /// Whether every fighter body has a finite pose and velocity
    pub fn is_finite(&self) -> bool {
        self.fighters.iter().flat_map(|f| &f.bodies).all(|&h| {
            let body = &self.bodies[h];
            body.translation().iter().all(|x| x.is_finite())
                && body.rotation().coords.iter().all(|x| x.is_finite())
                && body.linvel().iter().all(|x| x.is_finite())
                && body.angvel().iter().all(|x| x.is_finite())
        })
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Whether the collision filters of two geoms let them touch
    pub fn can_collide(&self, g1: GeomId, g2: GeomId) -> bool {
        let groups = |g: GeomId| {
            self.geom_colliders
                .get(g.0)
                .and_then(|&h| self.colliders.get(h))
                .map(|c| c.collision_groups())
        };
        match (groups(g1), groups(g2)) {
            (Some(a), Some(b)) => a.test(b),
            _ => false,
        }
    }

    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }
}

fn spawn_origin<R: Rng>(config: &FightConfig, fighter: Fighter, rng: &mut R) -> Isometry3<f32> {
    let half = 0.5 * config.spawn_separation;
    let (mut x, mut yaw) = match fighter {
        Fighter::First => (-half, 0.0),
        Fighter::Second => (half, PI),
    };
    let mut y = 0.0;
    let noise = config.init_noise;
    if noise > 0.0 {
        x += rng.gen_range(-noise..=noise);
        y += rng.gen_range(-noise..=noise);
        yaw += rng.gen_range(-noise..=noise);
    }
    Isometry3::from_parts(
        Translation3::new(x, y, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw),
    )
}

fn build_fighter(
    humanoid: &HumanoidSpec,
    origin: Isometry3<f32>,
    bodies: &mut RigidBodySet,
    impulse_joints: &mut ImpulseJointSet,
) -> FighterBodies {
    let mut handles: Vec<RigidBodyHandle> = Vec::with_capacity(humanoid.bodies.len());
    let mut actuators = Vec::new();

    for spec in &humanoid.bodies {
        let [px, py, pz] = spec.position;
        let pose = origin * Isometry3::translation(px, py, pz);
        let handle = bodies.insert(RigidBodyBuilder::dynamic().position(pose).build());

        let parent = spec
            .parent
            .as_ref()
            .and_then(|p| humanoid.bodies.iter().position(|b| &b.name == p));
        if let (Some(parent_idx), Some(joint)) = (parent, &spec.joint) {
            let parent_spec = &humanoid.bodies[parent_idx];
            let anchor = |body: [f32; 3]| {
                point![
                    joint.anchor[0] - body[0],
                    joint.anchor[1] - body[1],
                    joint.anchor[2] - body[2]
                ]
            };

            let mut locked = JointAxesMask::LIN_AXES;
            for axis in [Axis::X, Axis::Y, Axis::Z] {
                if !joint.axes.iter().any(|a| a.axis == axis) {
                    locked |= angular_mask(axis);
                }
            }
            let mut builder = GenericJointBuilder::new(locked)
                .local_anchor1(anchor(parent_spec.position))
                .local_anchor2(anchor(spec.position))
                .contacts_enabled(false);
            for axis in &joint.axes {
                builder = builder.limits(joint_axis(axis.axis), axis.range);
                actuators.push(Actuator {
                    parent: handles[parent_idx],
                    child: handle,
                    axis: axis.axis,
                    gear: axis.gear,
                });
            }
            impulse_joints.insert(handles[parent_idx], handle, builder, true);
        }
        handles.push(handle);
    }

    FighterBodies {
        bodies: handles,
        actuators,
    }
}

fn angular_mask(axis: Axis) -> JointAxesMask {
    match axis {
        Axis::X => JointAxesMask::ANG_X,
        Axis::Y => JointAxesMask::ANG_Y,
        Axis::Z => JointAxesMask::ANG_Z,
    }
}

fn joint_axis(axis: Axis) -> JointAxis {
    match axis {
        Axis::X => JointAxis::AngX,
        Axis::Y => JointAxis::AngY,
        Axis::Z => JointAxis::AngZ,
    }
}

fn collider_builder(shape: &GeomShape) -> ColliderBuilder {
    match *shape {
        GeomShape::Sphere { center, radius } => {
            ColliderBuilder::ball(radius).translation(vector![center[0], center[1], center[2]])
        }
        GeomShape::Capsule { from, to, radius } => ColliderBuilder::capsule_from_endpoints(
            point![from[0], from[1], from[2]],
            point![to[0], to[1], to[2]],
            radius,
        ),
        GeomShape::Cuboid {
            center,
            half_extents,
        } => ColliderBuilder::cuboid(half_extents[0], half_extents[1], half_extents[2])
            .translation(vector![center[0], center[1], center[2]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::arena_geoms;
    use crate::render::Palette;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn build(config: &FightConfig) -> (Model, Simulation) {
        let model = Model::new(
            &config.humanoid,
            arena_geoms(config.arena_half_extent, config.wall_height),
            &Palette::default(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let sim = Simulation::new(config, &model, &mut rng).unwrap();
        (model, sim)
    }

    #[test]
    fn test_state_sizes() {
        let (_, sim) = build(&FightConfig::default());
        assert_eq!(sim.qpos().len(), 2 * 28);
        assert_eq!(sim.qvel().len(), 2 * 27);
        assert_eq!(sim.ctrl().len(), 42);
    }

    #[test]
    fn test_spawn_poses_face_each_other() {
        let (_, sim) = build(&FightConfig::default());
        let p1 = sim.torso_pose(Fighter::First);
        let p2 = sim.torso_pose(Fighter::Second);
        assert!((p1.position[0] + 1.0).abs() < 1e-5);
        assert!((p2.position[0] - 1.0).abs() < 1e-5);
        assert!((p1.position[2] - 1.4).abs() < 1e-5);

        // second fighter is yawed by pi: w ~ 0, z ~ +-1
        assert!(p2.quaternion[0].abs() < 1e-5);
        assert!((p2.quaternion[3].abs() - 1.0).abs() < 1e-5);
        assert_eq!(sim.body_pose(Fighter::First, "torso").unwrap(), p1);
    }

    #[test]
    fn test_rest_joint_angles_are_zero() {
        let (_, sim) = build(&FightConfig::default());
        let qpos = sim.qpos();
        for half in qpos.chunks(28) {
            assert!(half[7..].iter().all(|a| a.abs() < 1e-5));
        }
    }

    #[test]
    fn test_set_ctrl_validation() {
        let (_, mut sim) = build(&FightConfig::default());
        assert!(matches!(
            sim.set_ctrl(&[0.0; 3]),
            Err(BrawlError::ShapeMismatch { .. })
        ));

        let mut ctrl = vec![0.0; 42];
        ctrl[5] = f32::NAN;
        assert!(matches!(sim.set_ctrl(&ctrl), Err(BrawlError::InvalidAction(_))));

        ctrl[5] = 4.0;
        ctrl[6] = -4.0;
        sim.set_ctrl(&ctrl).unwrap();
        assert_eq!(sim.ctrl()[5], 1.0);
        assert_eq!(sim.ctrl()[6], -1.0);
    }

    #[test]
    fn test_unknown_body() {
        let (_, sim) = build(&FightConfig::default());
        assert!(matches!(
            sim.body_pose(Fighter::First, "tail"),
            Err(BrawlError::UnknownName { kind: "body", .. })
        ));
    }

    #[test]
    fn test_feet_touch_floor_after_settling() {
        let (model, mut sim) = build(&FightConfig::default());
        let floor = model.geom("floor").unwrap();
        for _ in 0..40 {
            sim.step();
        }
        assert!(sim.is_finite());
        assert!(sim
            .contacts()
            .iter()
            .any(|c| c.geom1 == floor || c.geom2 == floor));
        assert_eq!(sim.steps(), 40);
    }

    #[test]
    fn test_init_noise_moves_spawn() {
        let config = FightConfig::default().with_init_noise(0.3);
        let (_, sim) = build(&config);
        let p1 = sim.torso_pose(Fighter::First);
        assert!((p1.position[0] + 1.0).abs() > 1e-6 || p1.position[1].abs() > 1e-6);

        // same seed, same spawn
        let (_, again) = build(&config);
        assert_eq!(again.torso_pose(Fighter::First), p1);
    }

    #[test]
    fn test_geom_pose_frames() {
        let (model, sim) = build(&FightConfig::default());
        let poses = sim.geom_poses();
        assert_eq!(poses.len(), model.len());
        let head = model.geom("head").unwrap();
        assert_eq!(poses[head.0], sim.torso_pose(Fighter::First));
        let floor = model.geom("floor").unwrap();
        assert_eq!(poses[floor.0].position, [0.0; 3]);
    }

    #[test]
    fn test_fighters_skip_own_geoms_by_default() {
        let config = FightConfig::default().with_spawn_separation(0.8);
        let (model, mut sim) = build(&config);
        let torso = model.geom("torso").unwrap();
        let foot = model.geom("foot1_left").unwrap();
        let other_hand = model.geom("2hand_right").unwrap();
        let floor = model.geom("floor").unwrap();
        let wall = model.geom("wall1").unwrap();

        assert!(!sim.can_collide(torso, foot));
        assert!(sim.can_collide(torso, other_hand));
        assert!(sim.can_collide(foot, floor));
        assert!(!sim.can_collide(floor, wall));

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..150 {
            let ctrl: Vec<f32> = (0..42).map(|_| rng.gen_range(-1.0..=1.0)).collect();
            sim.set_ctrl(&ctrl).unwrap();
            sim.step();
            for c in sim.contacts() {
                let (o1, o2) = (model.owner(c.geom1), model.owner(c.geom2));
                assert!(
                    o1 != o2 || o1 == Owner::Arena,
                    "{} touched {} of the same fighter",
                    model.name(c.geom1),
                    model.name(c.geom2)
                );
            }
        }
    }

    #[test]
    fn test_self_collisions_enable_own_group() {
        let (model, sim) = build(&FightConfig::default().with_self_collisions(true));
        for fighter in Fighter::ALL {
            let torso = model.geom(&fighter.part_name("torso")).unwrap();
            let foot = model.geom(&fighter.part_name("foot1_left")).unwrap();
            let hand = model.geom(&fighter.part_name("hand_right")).unwrap();
            assert!(sim.can_collide(torso, foot));
            assert!(sim.can_collide(hand, foot));
        }
        let floor = model.geom("floor").unwrap();
        let wall = model.geom("wall2").unwrap();
        assert!(!sim.can_collide(floor, wall));
    }

    #[test]
    fn test_timestep_from_config() {
        let (_, sim) = build(&FightConfig::default());
        assert_eq!(sim.timestep(), FightConfig::default().timestep);
    }
}
