//! Camera tracking, geom colours and renderable frames.
//!
//! Nothing here draws pixels. A [`Frame`] carries what an external viewer
//! needs (camera plus every geom's shape, pose and colour) and can be dumped
//! as JSON; [`Frame::ascii`] gives a coarse top-down view for terminals.

use crate::config::CameraConfig;
use crate::model::{Fighter, GeomShape, Model, Owner};
use crate::sim::Pose;
use rapier3d::na::{Quaternion, UnitQuaternion, Vector3};
use serde::Serialize;
use std::fmt::Write;

/// Geom colours (RGBA)
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub first: [f32; 4],
    pub second: [f32; 4],
    pub hit: [f32; 4],
    pub arena: [f32; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            first: [0.5, 0.5, 1.0, 1.0],
            second: [0.5, 1.0, 0.5, 1.0],
            hit: [1.0, 0.5, 0.5, 1.0],
            arena: [0.6, 0.6, 0.6, 1.0],
        }
    }
}

impl Palette {
    pub fn fighter(&self, fighter: Fighter) -> [f32; 4] {
        match fighter {
            Fighter::First => self.first,
            Fighter::Second => self.second,
        }
    }
}

/// Follows the midpoint between the two torsos, pulling back as they separate
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Camera {
    pub lookat: [f32; 3],
    pub distance: f32,
    #[serde(skip)]
    config: CameraConfig,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            lookat: [0.0; 3],
            distance: config.initial_distance,
            config: config.clone(),
        }
    }

    /// Distance the camera converges to for a given torso separation
    pub fn target_distance(&self, inter_distance: f32) -> f32 {
        let c = &self.config;
        (c.base_distance + (inter_distance - c.reference_separation)).max(c.min_distance)
    }

    /// One smoothing update toward the torsos' ground-level midpoint
    pub fn track(&mut self, torso1: [f32; 3], torso2: [f32; 3]) {
        let s = self.config.smoothness;
        let poi = [
            0.5 * (torso1[0] + torso2[0]),
            0.5 * (torso1[1] + torso2[1]),
            0.0,
        ];
        let inter = torso1
            .iter()
            .zip(&torso2)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt();
        let target = self.target_distance(inter);

        for (l, p) in self.lookat.iter_mut().zip(poi) {
            *l = *l * s + (1.0 - s) * p;
        }
        self.distance = self.distance * s + (1.0 - s) * target;
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GeomFrame {
    pub name: String,
    pub owner: Owner,
    /// Shape in the local frame given by `position`/`quaternion`
    pub shape: GeomShape,
    pub position: [f32; 3],
    pub quaternion: [f32; 4],
    pub rgba: [f32; 4],
}

impl GeomFrame {
    /// World position of the shape's centre
    pub fn world_center(&self) -> [f32; 3] {
        let [w, x, y, z] = self.quaternion;
        let rot = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        let p = rot * Vector3::from(self.shape.center()) + Vector3::from(self.position);
        [p.x, p.y, p.z]
    }
}

/// Everything needed to draw one step
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub step: u32,
    pub camera: Camera,
    pub geoms: Vec<GeomFrame>,
}

const FIRST_MARK: char = '1';
const SECOND_MARK: char = '2';
const HIT_MARK: char = '*';
const WALL_MARK: char = '#';
const FLOOR_MARK: char = '.';

impl Frame {
    /// `poses` is indexed by geom id, as returned by `Simulation::geom_poses`
    pub fn capture(step: u32, camera: &Camera, model: &Model, poses: &[Pose]) -> Self {
        let geoms = model
            .iter()
            .zip(poses)
            .map(|((_, info), pose)| GeomFrame {
                name: info.name.clone(),
                owner: info.owner,
                shape: info.shape.clone(),
                position: pose.position,
                quaternion: pose.quaternion,
                rgba: info.rgba,
            })
            .collect();
        Self {
            step,
            camera: camera.clone(),
            geoms,
        }
    }

    /// Top-down character view centred on the camera, `distance` metres wide.
    pub fn ascii(&self, cols: usize, rows: usize, palette: &Palette) -> String {
        let cols = cols.max(2);
        let rows = rows.max(2);
        let width = self.camera.distance.max(1e-3);
        // terminal cells are about twice as tall as wide
        let cell_w = width / cols as f32;
        let cell_h = 2.0 * cell_w;
        let [cx, cy, _] = self.camera.lookat;

        let cell_of = |x: f32, y: f32| -> Option<(usize, usize)> {
            let col = ((x - cx) / cell_w + 0.5 * cols as f32).floor();
            let row = (0.5 * rows as f32 - (y - cy) / cell_h).floor();
            if col < 0.0 || row < 0.0 || col >= cols as f32 || row >= rows as f32 {
                None
            } else {
                Some((row as usize, col as usize))
            }
        };
        let center_of = |row: usize, col: usize| -> (f32, f32) {
            (
                cx + (col as f32 + 0.5 - 0.5 * cols as f32) * cell_w,
                cy + (0.5 * rows as f32 - row as f32 - 0.5) * cell_h,
            )
        };

        let mut grid = vec![vec![' '; cols]; rows];

        // arena cuboids are axis aligned
        for geom in self.geoms.iter().filter(|g| g.owner == Owner::Arena) {
            let GeomShape::Cuboid {
                center,
                half_extents,
            } = geom.shape
            else {
                continue;
            };
            let [gx, gy, gz] = geom.position;
            let (ox, oy) = (gx + center[0], gy + center[1]);
            let floor = gz + center[2] + half_extents[2] <= 0.0;
            let mark = if floor { FLOOR_MARK } else { WALL_MARK };
            for (row, line) in grid.iter_mut().enumerate() {
                for (col, cell) in line.iter_mut().enumerate() {
                    let (x, y) = center_of(row, col);
                    let inside = (x - ox).abs() <= half_extents[0].max(0.5 * cell_w)
                        && (y - oy).abs() <= half_extents[1].max(0.5 * cell_h);
                    if inside && (!floor || *cell == ' ') {
                        *cell = mark;
                    }
                }
            }
        }

        // fighters, lowest first so heads end up on top
        let mut parts: Vec<(f32, (usize, usize), char)> = self
            .geoms
            .iter()
            .filter_map(|g| {
                let Owner::Fighter(fighter) = g.owner else {
                    return None;
                };
                let [x, y, z] = g.world_center();
                let mark = if g.rgba == palette.hit {
                    HIT_MARK
                } else {
                    match fighter {
                        Fighter::First => FIRST_MARK,
                        Fighter::Second => SECOND_MARK,
                    }
                };
                cell_of(x, y).map(|cell| (z, cell, mark))
            })
            .collect();
        parts.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, (row, col), mark) in parts {
            grid[row][col] = mark;
        }

        let mut out = String::with_capacity((cols + 1) * (rows + 1) + 64);
        let _ = writeln!(
            out,
            "step {:>5}  camera ({:+.2}, {:+.2}) distance {:.2}",
            self.step, cx, cy, self.camera.distance
        );
        for line in grid {
            out.extend(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{arena_geoms, HumanoidSpec};

    #[test]
    fn test_target_distance() {
        let camera = Camera::new(&CameraConfig::default());
        assert_eq!(camera.target_distance(6.0), 10.0);
        assert_eq!(camera.target_distance(8.5), 12.5);
        assert_eq!(camera.target_distance(0.0), 4.0);
        assert_eq!(Camera::new(&CameraConfig::default()).distance, 10.0);

        let mut config = CameraConfig::default();
        config.base_distance = 3.0;
        // clamped to min_distance
        assert_eq!(Camera::new(&config).target_distance(1.0), 2.0);
    }

    #[test]
    fn test_track_smoothing() {
        let mut camera = Camera::new(&CameraConfig::default());
        // torsos 2m apart around (1, 1)
        camera.track([0.0, 1.0, 1.4], [2.0, 1.0, 1.4]);

        assert!((camera.lookat[0] - 0.01).abs() < 1e-6);
        assert!((camera.lookat[1] - 0.01).abs() < 1e-6);
        assert_eq!(camera.lookat[2], 0.0);
        // target = 10 + (2 - 6) = 6
        assert!((camera.distance - (10.0 * 0.99 + 0.01 * 6.0)).abs() < 1e-5);
    }

    #[test]
    fn test_track_converges() {
        let mut config = CameraConfig::default();
        config.smoothness = 0.5;
        let mut camera = Camera::new(&config);
        for _ in 0..60 {
            camera.track([-3.0, 2.0, 1.0], [3.0, 2.0, 1.0]);
        }
        assert!((camera.lookat[1] - 2.0).abs() < 1e-4);
        assert!((camera.distance - 10.0).abs() < 1e-4);
    }

    fn frame_with_hit() -> (Frame, Palette) {
        let palette = Palette::default();
        let mut model =
            Model::new(&HumanoidSpec::default(), arena_geoms(5.0, 1.0), &palette).unwrap();
        model.set_rgba(model.geom("2head").unwrap(), palette.hit);

        let at = |x: f32, yaw_w: f32, yaw_z: f32| Pose {
            position: [x, 0.0, 1.4],
            quaternion: [yaw_w, 0.0, 0.0, yaw_z],
        };
        let poses: Vec<Pose> = model
            .iter()
            .map(|(_, g)| match g.owner {
                Owner::Fighter(Fighter::First) => at(-1.0, 1.0, 0.0),
                Owner::Fighter(Fighter::Second) => at(1.0, 0.0, 1.0),
                Owner::Arena => Pose {
                    position: [0.0; 3],
                    quaternion: [1.0, 0.0, 0.0, 0.0],
                },
            })
            .collect();
        let camera = Camera::new(&CameraConfig::default());
        (Frame::capture(7, &camera, &model, &poses), palette)
    }

    #[test]
    fn test_ascii_marks_fighters_and_hits() {
        let (frame, palette) = frame_with_hit();
        let view = frame.ascii(40, 20, &palette);

        assert!(view.starts_with("step     7"));
        assert_eq!(view.lines().count(), 21);
        assert!(view.contains(FIRST_MARK));
        assert!(view.contains(SECOND_MARK));
        assert!(view.contains(HIT_MARK));
        assert!(view.contains(FLOOR_MARK));
    }

    #[test]
    fn test_frame_serializes() {
        let (frame, _) = frame_with_hit();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["step"], 7);
        assert_eq!(json["geoms"].as_array().unwrap().len(), 43);
        assert_eq!(json["geoms"][0]["owner"]["fighter"], "first");
        assert!(json["camera"]["distance"].is_number());
    }

    #[test]
    fn test_world_center_applies_rotation() {
        let (frame, _) = frame_with_hit();
        let head = frame.geoms.iter().find(|g| g.name == "2head").unwrap();
        let [x, _, z] = head.world_center();
        assert!((x - 1.0).abs() < 1e-5);
        assert!((z - 1.59).abs() < 1e-5);

        let hand = frame.geoms.iter().find(|g| g.name == "2hand_left").unwrap();
        // yawed by pi, so the guard points toward -x
        assert!(hand.world_center()[0] < 1.0);
    }
}
