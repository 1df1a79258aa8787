//! Humanoid ragdoll description.
//!
//! A fighter is a tree of rigid bodies. Every body carries one or more
//! collision geoms and, except for the root, a joint to its parent with up
//! to three actuated rotation axes. Positions are given in the fighter's
//! rest frame: origin on the floor between the feet, +x forward, +z up.

use brawl::{BrawlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rotation axis of an actuated joint, expressed in the parent body frame
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> [f32; 3] {
        let mut v = [0.0; 3];
        v[self.index()] = 1.0;
        v
    }
}

/// Collision shape of a geom, in body-local coordinates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeomShape {
    Sphere {
        center: [f32; 3],
        radius: f32,
    },
    Capsule {
        from: [f32; 3],
        to: [f32; 3],
        radius: f32,
    },
    Cuboid {
        center: [f32; 3],
        half_extents: [f32; 3],
    },
}

impl GeomShape {
    /// Geometric centre in body-local coordinates
    pub fn center(&self) -> [f32; 3] {
        match self {
            GeomShape::Sphere { center, .. } | GeomShape::Cuboid { center, .. } => *center,
            GeomShape::Capsule { from, to, .. } => [
                0.5 * (from[0] + to[0]),
                0.5 * (from[1] + to[1]),
                0.5 * (from[2] + to[2]),
            ],
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let ok = match self {
            GeomShape::Sphere { radius, .. } => *radius > 0.0,
            GeomShape::Capsule { radius, .. } => *radius > 0.0,
            GeomShape::Cuboid { half_extents, .. } => half_extents.iter().all(|&h| h > 0.0),
        };
        if ok {
            Ok(())
        } else {
            Err(BrawlError::InvalidConfig(format!(
                "geom '{}' has a non-positive size",
                name
            )))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeomSpec {
    pub name: String,
    pub shape: GeomShape,
}

/// One actuated rotation axis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointAxisSpec {
    pub name: String,
    pub axis: Axis,
    /// Limits in radians
    pub range: [f32; 2],
    /// Torque per unit of control
    pub gear: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    /// Pivot in the fighter rest frame
    pub anchor: [f32; 3],
    /// Free rotation axes; an empty list welds the body to its parent
    pub axes: Vec<JointAxisSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Body origin in the fighter rest frame
    pub position: [f32; 3],
    pub geoms: Vec<GeomSpec>,
    #[serde(default)]
    pub joint: Option<JointSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HumanoidSpec {
    /// Bodies in tree order; the first one is the free-floating root
    pub bodies: Vec<BodySpec>,
    /// Body whose pose enters observations and the approach reward
    pub torso_body: String,
    /// Geoms allowed to score hits on the opponent
    pub strike_geoms: Vec<String>,
    pub density: f32,
    pub friction: f32,
}

impl HumanoidSpec {
    /// Number of actuated axes, i.e. the per-fighter action size
    pub fn actuator_count(&self) -> usize {
        self.bodies
            .iter()
            .filter_map(|b| b.joint.as_ref())
            .map(|j| j.axes.len())
            .sum()
    }

    pub fn geom_names(&self) -> impl Iterator<Item = &str> {
        self.bodies
            .iter()
            .flat_map(|b| b.geoms.iter().map(|g| g.name.as_str()))
    }

    pub fn body(&self, name: &str) -> Option<&BodySpec> {
        self.bodies.iter().find(|b| b.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BrawlError::InvalidConfig(msg));

        let Some(root) = self.bodies.first() else {
            return invalid("humanoid has no bodies".to_string());
        };
        if root.parent.is_some() {
            return invalid(format!("root body '{}' must not have a parent", root.name));
        }
        if self.density <= 0.0 || self.friction < 0.0 {
            return invalid("humanoid density must be positive and friction non-negative".into());
        }

        let mut bodies = HashSet::new();
        let mut geoms = HashSet::new();
        for (i, body) in self.bodies.iter().enumerate() {
            match (&body.parent, i) {
                (None, 0) => {}
                (None, _) => return invalid(format!("body '{}' has no parent", body.name)),
                (Some(parent), _) if !bodies.contains(parent.as_str()) => {
                    return invalid(format!(
                        "body '{}' refers to undeclared parent '{}'",
                        body.name, parent
                    ))
                }
                (Some(_), _) if body.joint.is_none() => {
                    return invalid(format!("body '{}' has a parent but no joint", body.name))
                }
                _ => {}
            }
            if !bodies.insert(body.name.as_str()) {
                return invalid(format!("duplicate body name '{}'", body.name));
            }

            for geom in &body.geoms {
                geom.shape.validate(&geom.name)?;
                if !geoms.insert(geom.name.as_str()) {
                    return invalid(format!("duplicate geom name '{}'", geom.name));
                }
            }

            if let Some(joint) = &body.joint {
                let mut seen = HashSet::new();
                for axis in &joint.axes {
                    if axis.range[0] > axis.range[1] {
                        return invalid(format!("joint axis '{}' has an inverted range", axis.name));
                    }
                    if axis.gear < 0.0 {
                        return invalid(format!("joint axis '{}' has a negative gear", axis.name));
                    }
                    if !seen.insert(axis.axis) {
                        return invalid(format!(
                            "body '{}' declares the {:?} axis twice",
                            body.name, axis.axis
                        ));
                    }
                }
            }
        }

        if !bodies.contains(self.torso_body.as_str()) {
            return invalid(format!("torso body '{}' is not declared", self.torso_body));
        }
        for strike in &self.strike_geoms {
            if !geoms.contains(strike.as_str()) {
                return invalid(format!("strike geom '{}' is not declared", strike));
            }
        }
        Ok(())
    }
}

fn axis(name: impl Into<String>, axis: Axis, range_deg: [f32; 2], gear: f32) -> JointAxisSpec {
    JointAxisSpec {
        name: name.into(),
        axis,
        range: [range_deg[0].to_radians(), range_deg[1].to_radians()],
        gear,
    }
}

fn capsule(name: impl Into<String>, from: [f32; 3], to: [f32; 3], radius: f32) -> GeomSpec {
    GeomSpec {
        name: name.into(),
        shape: GeomShape::Capsule { from, to, radius },
    }
}

fn sphere(name: impl Into<String>, center: [f32; 3], radius: f32) -> GeomSpec {
    GeomSpec {
        name: name.into(),
        shape: GeomShape::Sphere { center, radius },
    }
}

fn child(
    name: impl Into<String>,
    parent: &str,
    position: [f32; 3],
    geoms: Vec<GeomSpec>,
    anchor: [f32; 3],
    axes: Vec<JointAxisSpec>,
) -> BodySpec {
    BodySpec {
        name: name.into(),
        parent: Some(parent.to_string()),
        position,
        geoms,
        joint: Some(JointSpec { anchor, axes }),
    }
}

/// Leg bodies for one side; `s` is +1 for left, -1 for right.
fn leg(side: &str, s: f32) -> Vec<BodySpec> {
    let thigh = format!("thigh_{}", side);
    let shin = format!("shin_{}", side);
    let foot = format!("foot_{}", side);
    let hip = [-0.01, 0.1 * s, 0.935];
    let knee = [-0.01, 0.09 * s, 0.552];
    let ankle = [-0.01, 0.09 * s, 0.075];
    vec![
        child(
            thigh.clone(),
            "pelvis",
            hip,
            vec![capsule(thigh.clone(), [0.0; 3], [0.0, -0.01 * s, -0.34], 0.06)],
            hip,
            vec![
                // abduction is mirrored so positive always moves the leg outward
                axis(format!("hip_x_{}", side), Axis::X, if s > 0.0 { [-5.0, 25.0] } else { [-25.0, 5.0] }, 100.0),
                axis(format!("hip_z_{}", side), Axis::Z, [-60.0, 35.0], 100.0),
                axis(format!("hip_y_{}", side), Axis::Y, [-110.0, 20.0], 100.0),
            ],
        ),
        child(
            shin.clone(),
            &thigh,
            [-0.01, 0.09 * s, 0.532],
            vec![capsule(shin.clone(), [0.0; 3], [0.0, 0.0, -0.4], 0.049)],
            knee,
            vec![axis(format!("knee_{}", side), Axis::Y, [2.0, 160.0], 200.0)],
        ),
        child(
            foot,
            &shin,
            [-0.01, 0.09 * s, 0.045],
            vec![
                capsule(format!("foot1_{}", side), [-0.07, -0.02 * s, 0.0], [0.14, -0.04 * s, 0.0], 0.027),
                capsule(format!("foot2_{}", side), [-0.07, 0.0, 0.0], [0.14, 0.02 * s, 0.0], 0.027),
            ],
            ankle,
            vec![
                axis(format!("ankle_y_{}", side), Axis::Y, [-45.0, 45.0], 50.0),
                axis(format!("ankle_x_{}", side), Axis::X, [-30.0, 30.0], 50.0),
            ],
        ),
    ]
}

/// Arm bodies for one side, held up in a guard
fn arm(side: &str, s: f32) -> Vec<BodySpec> {
    let upper = format!("upper_arm_{}", side);
    let lower = format!("lower_arm_{}", side);
    let shoulder = [0.0, 0.17 * s, 1.46];
    let elbow = [0.18, 0.23 * s, 1.28];
    vec![
        child(
            upper.clone(),
            "torso",
            shoulder,
            vec![capsule(upper.clone(), [0.0; 3], [0.16, 0.06 * s, -0.16], 0.04)],
            shoulder,
            vec![
                axis(format!("shoulder1_{}", side), Axis::X, [-85.0, 60.0], 25.0),
                axis(format!("shoulder2_{}", side), Axis::Y, [-85.0, 60.0], 25.0),
            ],
        ),
        child(
            lower.clone(),
            &upper,
            elbow,
            vec![
                capsule(lower.clone(), [0.01, 0.0, 0.01], [0.17, -0.05 * s, 0.17], 0.031),
                sphere(format!("hand_{}", side), [0.18, -0.06 * s, 0.18], 0.04),
            ],
            elbow,
            vec![axis(format!("elbow_{}", side), Axis::Y, [-90.0, 50.0], 25.0)],
        ),
    ]
}

impl Default for HumanoidSpec {
    /// A 13-body, 19-geom humanoid about 1.55 m tall with 21 actuated axes.
    fn default() -> Self {
        let mut bodies = vec![
            BodySpec {
                name: "torso".to_string(),
                parent: None,
                position: [0.0, 0.0, 1.4],
                geoms: vec![
                    capsule("torso", [0.0, -0.07, 0.0], [0.0, 0.07, 0.0], 0.07),
                    sphere("head", [0.0, 0.0, 0.19], 0.09),
                    capsule("waist_upper", [-0.01, -0.06, -0.12], [-0.01, 0.06, -0.12], 0.06),
                ],
                joint: None,
            },
            child(
                "waist_lower",
                "torso",
                [-0.01, 0.0, 1.14],
                vec![capsule("waist_lower", [0.0, -0.06, 0.0], [0.0, 0.06, 0.0], 0.06)],
                [-0.01, 0.0, 1.205],
                vec![
                    axis("abdomen_z", Axis::Z, [-45.0, 45.0], 100.0),
                    axis("abdomen_y", Axis::Y, [-75.0, 30.0], 100.0),
                ],
            ),
            child(
                "pelvis",
                "waist_lower",
                [-0.01, 0.0, 0.975],
                vec![capsule("butt", [-0.02, -0.07, 0.0], [-0.02, 0.07, 0.0], 0.09)],
                [-0.01, 0.0, 1.075],
                vec![axis("abdomen_x", Axis::X, [-35.0, 35.0], 100.0)],
            ),
        ];
        bodies.extend(leg("right", -1.0));
        bodies.extend(leg("left", 1.0));
        bodies.extend(arm("right", -1.0));
        bodies.extend(arm("left", 1.0));

        Self {
            bodies,
            torso_body: "torso".to_string(),
            strike_geoms: [
                "hand_left",
                "hand_right",
                "foot1_left",
                "foot2_left",
                "foot1_right",
                "foot2_right",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            density: 1000.0,
            friction: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_humanoid_shape() {
        let spec = HumanoidSpec::default();
        spec.validate().unwrap();

        assert_eq!(spec.bodies.len(), 13);
        assert_eq!(spec.geom_names().count(), 19);
        assert_eq!(spec.actuator_count(), 21);
    }

    #[test]
    fn test_default_geom_names() {
        let spec = HumanoidSpec::default();
        let names: HashSet<&str> = spec.geom_names().collect();
        for expected in [
            "torso", "head", "butt", "waist_upper", "waist_lower",
            "foot1_right", "foot2_right", "foot1_left", "foot2_left",
            "upper_arm_right", "upper_arm_left", "lower_arm_right", "lower_arm_left",
            "hand_left", "hand_right", "shin_left", "shin_right", "thigh_left", "thigh_right",
        ] {
            assert!(names.contains(expected), "missing geom {}", expected);
        }
    }

    #[test]
    fn test_feet_rest_above_floor() {
        let spec = HumanoidSpec::default();
        let foot = spec.body("foot_left").unwrap();
        for geom in &foot.geoms {
            let GeomShape::Capsule { from, radius, .. } = geom.shape else {
                panic!("feet are capsules");
            };
            let bottom = foot.position[2] + from[2] - radius;
            assert!(bottom > 0.0 && bottom < 0.05, "bottom at {}", bottom);
        }
    }

    #[test]
    fn test_validate_rejects_unknown_parent() {
        let mut spec = HumanoidSpec::default();
        spec.bodies[1].parent = Some("nope".to_string());
        assert!(matches!(spec.validate(), Err(BrawlError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_missing_strike_geom() {
        let mut spec = HumanoidSpec::default();
        spec.strike_geoms.push("tail".to_string());
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_geom() {
        let mut spec = HumanoidSpec::default();
        spec.bodies[1].geoms[0].name = "head".to_string();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut spec = HumanoidSpec::default();
        let joint = spec.bodies[1].joint.as_mut().unwrap();
        joint.axes[0].range = [1.0, -1.0];
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_spec_json_roundtrip_keeps_tags() {
        let spec = HumanoidSpec::default();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"type\":\"capsule\""));
        let back: HumanoidSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
