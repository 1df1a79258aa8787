//! Hit classification and contact-force scoring.

use crate::model::{Fighter, GeomId, Model, Owner};
use crate::sim::Contact;
use brawl::Result;
use std::collections::{BTreeSet, HashSet};

/// Which geoms may strike and which may be struck, per attacker
#[derive(Clone, Debug)]
pub struct HitTable {
    strikers: [HashSet<GeomId>; 2],
    targets: [HashSet<GeomId>; 2],
}

impl HitTable {
    /// `strike_names` are humanoid geom names without the fighter prefix.
    /// Every geom of the opponent is a target; arena geoms are never targets.
    pub fn new(model: &Model, strike_names: &[String]) -> Result<Self> {
        let mut strikers: [HashSet<GeomId>; 2] = Default::default();
        let mut targets: [HashSet<GeomId>; 2] = Default::default();

        for fighter in Fighter::ALL {
            for name in strike_names {
                strikers[fighter.index()].insert(model.geom(&fighter.part_name(name))?);
            }
            targets[fighter.index()] = model
                .owned_by(Owner::Fighter(fighter.other()))
                .collect();
        }
        Ok(Self { strikers, targets })
    }

    /// Whether a contact between `g1` and `g2` is a hit by `attacker`, in
    /// either order
    pub fn hits(&self, attacker: Fighter, g1: GeomId, g2: GeomId) -> bool {
        let strikers = &self.strikers[attacker.index()];
        let targets = &self.targets[attacker.index()];
        (strikers.contains(&g1) && targets.contains(&g2))
            || (strikers.contains(&g2) && targets.contains(&g1))
    }

    pub fn is_striker(&self, fighter: Fighter, geom: GeomId) -> bool {
        self.strikers[fighter.index()].contains(&geom)
    }

    pub fn is_target(&self, attacker: Fighter, geom: GeomId) -> bool {
        self.targets[attacker.index()].contains(&geom)
    }
}

/// Outcome of scoring one step's contacts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitReport {
    /// Scaled hit reward per fighter
    pub rewards: [f32; 2],
    /// Unscaled force summed over every scoring contact
    pub exchanged: f32,
    /// Geoms involved in any hit, with or without a solved force
    pub hit_geoms: BTreeSet<GeomId>,
    /// Number of scoring (attacker, contact) pairs
    pub hits: usize,
}

/// Score contacts for both attackers independently.
///
/// A contact that is a hit for both fighters (hand against hand) scores for
/// each, so its reward cancels out while `exchanged` counts it twice.
pub fn score_contacts(table: &HitTable, contacts: &[Contact], hit_scale: f32) -> HitReport {
    let mut report = HitReport::default();

    for contact in contacts {
        for attacker in Fighter::ALL {
            if !table.hits(attacker, contact.geom1, contact.geom2) {
                continue;
            }
            if let Some(force) = contact.force {
                report.rewards[attacker.index()] += force;
                report.rewards[attacker.other().index()] -= force;
                report.exchanged += force;
                report.hits += 1;
            }
            report.hit_geoms.insert(contact.geom1);
            report.hit_geoms.insert(contact.geom2);
        }
    }

    report.rewards[0] *= hit_scale;
    report.rewards[1] *= hit_scale;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{arena_geoms, HumanoidSpec};
    use crate::render::Palette;

    fn setup() -> (Model, HitTable) {
        let spec = HumanoidSpec::default();
        let model = Model::new(&spec, arena_geoms(5.0, 1.0), &Palette::default()).unwrap();
        let table = HitTable::new(&model, &spec.strike_geoms).unwrap();
        (model, table)
    }

    fn contact(model: &Model, a: &str, b: &str, force: Option<f32>) -> Contact {
        Contact {
            geom1: model.geom(a).unwrap(),
            geom2: model.geom(b).unwrap(),
            force,
            position: [0.0; 3],
        }
    }

    #[test]
    fn test_hits_either_order() {
        let (model, table) = setup();
        let hand = model.geom("hand_left").unwrap();
        let head2 = model.geom("2head").unwrap();

        assert!(table.hits(Fighter::First, hand, head2));
        assert!(table.hits(Fighter::First, head2, hand));
        assert!(!table.hits(Fighter::Second, hand, head2));
    }

    #[test]
    fn test_non_strikers_and_arena_never_hit() {
        let (model, table) = setup();
        let thigh = model.geom("thigh_left").unwrap();
        let head2 = model.geom("2head").unwrap();
        let floor = model.geom("floor").unwrap();
        let hand = model.geom("hand_right").unwrap();
        let own_head = model.geom("head").unwrap();

        assert!(!table.hits(Fighter::First, thigh, head2));
        assert!(!table.hits(Fighter::First, hand, floor));
        assert!(!table.hits(Fighter::First, hand, own_head));
        assert!(table.is_striker(Fighter::Second, model.geom("2foot1_right").unwrap()));
        assert!(!table.is_target(Fighter::First, floor));
    }

    #[test]
    fn test_score_single_hit() {
        let (model, table) = setup();
        let contacts = [contact(&model, "2butt", "foot2_right", Some(500.0))];

        let report = score_contacts(&table, &contacts, 0.001);
        assert!((report.rewards[0] - 0.5).abs() < 1e-6);
        assert!((report.rewards[1] + 0.5).abs() < 1e-6);
        assert_eq!(report.exchanged, 500.0);
        assert_eq!(report.hits, 1);
        assert_eq!(report.hit_geoms.len(), 2);
    }

    #[test]
    fn test_hand_on_hand_cancels() {
        let (model, table) = setup();
        let contacts = [contact(&model, "hand_left", "2hand_right", Some(100.0))];

        let report = score_contacts(&table, &contacts, 0.001);
        assert_eq!(report.rewards, [0.0, 0.0]);
        assert_eq!(report.exchanged, 200.0);
        assert_eq!(report.hits, 2);
    }

    #[test]
    fn test_unsolved_contact_marks_without_reward() {
        let (model, table) = setup();
        let contacts = [
            contact(&model, "hand_left", "2torso", None),
            contact(&model, "torso", "floor", Some(900.0)),
        ];

        let report = score_contacts(&table, &contacts, 0.001);
        assert_eq!(report.rewards, [0.0, 0.0]);
        assert_eq!(report.exchanged, 0.0);
        assert_eq!(report.hits, 0);
        assert!(report.hit_geoms.contains(&model.geom("2torso").unwrap()));
        assert!(!report.hit_geoms.contains(&model.geom("floor").unwrap()));
    }

    #[test]
    fn test_rewards_sum_over_contacts() {
        let (model, table) = setup();
        let contacts = [
            contact(&model, "hand_left", "2head", Some(300.0)),
            contact(&model, "2foot1_left", "shin_right", Some(100.0)),
        ];

        let report = score_contacts(&table, &contacts, 0.01);
        assert!((report.rewards[0] - 2.0).abs() < 1e-5);
        assert!((report.rewards[1] + 2.0).abs() < 1e-5);
        assert_eq!(report.exchanged, 400.0);
    }

    #[test]
    fn test_unknown_strike_geom() {
        let spec = HumanoidSpec::default();
        let model = Model::new(&spec, arena_geoms(5.0, 1.0), &Palette::default()).unwrap();
        assert!(HitTable::new(&model, &["claw".to_string()]).is_err());
    }
}
