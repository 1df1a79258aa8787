use super::{GeomShape, GeomSpec};

const FLOOR_THICKNESS: f32 = 0.1;
const WALL_THICKNESS: f32 = 0.1;

/// Floor plus four walls enclosing a square of side `2 * half_extent`.
///
/// The floor's top face is the plane z = 0.
pub fn arena_geoms(half_extent: f32, wall_height: f32) -> Vec<GeomSpec> {
    let outer = half_extent + WALL_THICKNESS;
    let hz = 0.5 * wall_height;
    let cuboid = |name: &str, center: [f32; 3], half_extents: [f32; 3]| GeomSpec {
        name: name.to_string(),
        shape: GeomShape::Cuboid {
            center,
            half_extents,
        },
    };

    vec![
        cuboid(
            "floor",
            [0.0, 0.0, -0.5 * FLOOR_THICKNESS],
            [outer, outer, 0.5 * FLOOR_THICKNESS],
        ),
        cuboid(
            "wall1",
            [half_extent + 0.5 * WALL_THICKNESS, 0.0, hz],
            [0.5 * WALL_THICKNESS, outer, hz],
        ),
        cuboid(
            "wall2",
            [-half_extent - 0.5 * WALL_THICKNESS, 0.0, hz],
            [0.5 * WALL_THICKNESS, outer, hz],
        ),
        cuboid(
            "wall3",
            [0.0, half_extent + 0.5 * WALL_THICKNESS, hz],
            [outer, 0.5 * WALL_THICKNESS, hz],
        ),
        cuboid(
            "wall4",
            [0.0, -half_extent - 0.5 * WALL_THICKNESS, hz],
            [outer, 0.5 * WALL_THICKNESS, hz],
        ),
    ]
}
