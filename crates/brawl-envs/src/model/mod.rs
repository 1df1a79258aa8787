//! Scene description: who owns which geom, and what it looks like.

mod arena;
mod humanoid;

pub use arena::arena_geoms;
pub use humanoid::{
    Axis, BodySpec, GeomShape, GeomSpec, HumanoidSpec, JointAxisSpec, JointSpec,
};

use crate::render::Palette;
use brawl::{BrawlError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// One of the two fighters
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fighter {
    First,
    Second,
}

impl Fighter {
    pub const ALL: [Fighter; 2] = [Fighter::First, Fighter::Second];

    pub fn index(self) -> usize {
        match self {
            Fighter::First => 0,
            Fighter::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Fighter::First),
            1 => Some(Fighter::Second),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Fighter::First => Fighter::Second,
            Fighter::Second => Fighter::First,
        }
    }

    /// Prefix applied to this fighter's body and geom names
    pub fn prefix(self) -> &'static str {
        match self {
            Fighter::First => "",
            Fighter::Second => "2",
        }
    }

    /// Name of this fighter's copy of a humanoid part
    pub fn part_name(self, base: &str) -> String {
        format!("{}{}", self.prefix(), base)
    }
}

impl fmt::Display for Fighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fighter{}", self.index() + 1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Fighter(Fighter),
    Arena,
}

/// Index into the model's geom table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GeomId(pub usize);

#[derive(Clone, Debug)]
pub struct GeomInfo {
    pub name: String,
    pub owner: Owner,
    /// Index into the humanoid body list, `None` for arena geoms
    pub body: Option<usize>,
    pub shape: GeomShape,
    pub rgba: [f32; 4],
}

/// Geom table shared by the simulation, the hit classifier and the renderer.
///
/// Fighter one's geoms come first, then fighter two's, then the arena, each
/// in humanoid declaration order.
#[derive(Clone, Debug)]
pub struct Model {
    geoms: Vec<GeomInfo>,
    index: HashMap<String, GeomId>,
    torso_body: usize,
    actuators: usize,
}

impl Model {
    pub fn new(humanoid: &HumanoidSpec, arena: Vec<GeomSpec>, palette: &Palette) -> Result<Self> {
        humanoid.validate()?;

        let torso_body = humanoid
            .bodies
            .iter()
            .position(|b| b.name == humanoid.torso_body)
            .ok_or_else(|| BrawlError::UnknownName {
                kind: "body",
                name: humanoid.torso_body.clone(),
            })?;

        let mut geoms = Vec::new();
        for fighter in Fighter::ALL {
            for (body_idx, body) in humanoid.bodies.iter().enumerate() {
                for geom in &body.geoms {
                    geoms.push(GeomInfo {
                        name: fighter.part_name(&geom.name),
                        owner: Owner::Fighter(fighter),
                        body: Some(body_idx),
                        shape: geom.shape.clone(),
                        rgba: palette.fighter(fighter),
                    });
                }
            }
        }
        for geom in arena {
            geoms.push(GeomInfo {
                name: geom.name,
                owner: Owner::Arena,
                body: None,
                shape: geom.shape,
                rgba: palette.arena,
            });
        }

        let mut index = HashMap::with_capacity(geoms.len());
        for (i, geom) in geoms.iter().enumerate() {
            if index.insert(geom.name.clone(), GeomId(i)).is_some() {
                return Err(BrawlError::InvalidConfig(format!(
                    "geom name '{}' is used twice in the scene",
                    geom.name
                )));
            }
        }

        Ok(Self {
            geoms,
            index,
            torso_body,
            actuators: humanoid.actuator_count(),
        })
    }

    pub fn geom(&self, name: &str) -> Result<GeomId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| BrawlError::UnknownName {
                kind: "geom",
                name: name.to_string(),
            })
    }

    pub fn info(&self, id: GeomId) -> &GeomInfo {
        &self.geoms[id.0]
    }

    pub fn name(&self, id: GeomId) -> &str {
        &self.geoms[id.0].name
    }

    pub fn owner(&self, id: GeomId) -> Owner {
        self.geoms[id.0].owner
    }

    pub fn set_rgba(&mut self, id: GeomId, rgba: [f32; 4]) {
        self.geoms[id.0].rgba = rgba;
    }

    /// Set the colour of every geom owned by `owner`
    pub fn paint_owned(&mut self, owner: Owner, rgba: [f32; 4]) {
        for geom in self.geoms.iter_mut().filter(|g| g.owner == owner) {
            geom.rgba = rgba;
        }
    }

    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeomId, &GeomInfo)> {
        self.geoms.iter().enumerate().map(|(i, g)| (GeomId(i), g))
    }

    /// Geoms owned by `owner`, in table order
    pub fn owned_by(&self, owner: Owner) -> impl Iterator<Item = GeomId> + '_ {
        self.iter()
            .filter(move |(_, g)| g.owner == owner)
            .map(|(id, _)| id)
    }

    /// Index of the torso in the humanoid body list
    pub fn torso_body(&self) -> usize {
        self.torso_body
    }

    pub fn actuators_per_fighter(&self) -> usize {
        self.actuators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model::new(
            &HumanoidSpec::default(),
            arena_geoms(5.0, 1.0),
            &Palette::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_geom_table_layout() {
        let model = model();
        assert_eq!(model.len(), 19 * 2 + 5);
        assert_eq!(model.owned_by(Owner::Fighter(Fighter::First)).count(), 19);
        assert_eq!(model.owned_by(Owner::Fighter(Fighter::Second)).count(), 19);
        assert_eq!(model.owned_by(Owner::Arena).count(), 5);
        assert_eq!(model.actuators_per_fighter(), 21);
    }

    #[test]
    fn test_second_fighter_prefix() {
        let model = model();
        let id = model.geom("2hand_left").unwrap();
        assert_eq!(model.owner(id), Owner::Fighter(Fighter::Second));
        assert_eq!(model.info(id).rgba, Palette::default().second);

        let id = model.geom("hand_left").unwrap();
        assert_eq!(model.owner(id), Owner::Fighter(Fighter::First));
        assert_eq!(model.owner(model.geom("wall3").unwrap()), Owner::Arena);
    }

    #[test]
    fn test_unknown_geom() {
        let err = model().geom("tail").unwrap_err();
        assert!(matches!(err, BrawlError::UnknownName { kind: "geom", .. }));
    }

    #[test]
    fn test_arena_name_clash_rejected() {
        let mut arena = arena_geoms(5.0, 1.0);
        arena[0].name = "head".to_string();
        let result = Model::new(&HumanoidSpec::default(), arena, &Palette::default());
        assert!(matches!(result, Err(BrawlError::InvalidConfig(_))));
    }

    #[test]
    fn test_fighter_helpers() {
        assert_eq!(Fighter::First.other(), Fighter::Second);
        assert_eq!(Fighter::from_index(1), Some(Fighter::Second));
        assert_eq!(Fighter::from_index(2), None);
        assert_eq!(Fighter::Second.part_name("torso"), "2torso");
        assert_eq!(Fighter::Second.to_string(), "fighter2");
    }
}
