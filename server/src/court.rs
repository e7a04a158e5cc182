//! Static court geometry.
//!
//! A lobby builds one [`Court`] when it is created and never mutates it: the
//! floor slab, four boundary walls and two mirrored hoop assemblies, each
//! hoop with an invisible scoring trigger just beneath its rim. Every box is
//! stored as its world-space AABB, computed once here.

use crate::aabb::Aabb;
use hoops_shared::vec3::{vec3, Vec3};

/// Court floor footprint (X by Z). The floor's top face is at y = 0.
pub const COURT_WIDTH: f64 = 20.0;
pub const COURT_LENGTH: f64 = 34.0;
const FLOOR_THICKNESS: f64 = 1.0;

const WALL_THICKNESS: f64 = 1.0;
const WALL_HEIGHT: f64 = 5.0;
const WALL_CENTER_Y: f64 = 2.0;

/// Distance of each hoop's backboard from the court centre along Z
pub const HOOP_DISTANCE: f64 = 15.0;
const RIM_HEIGHT: f64 = 2.8;
const RIM_OFFSET: f64 = 0.45;
const RIM_RADIUS: f64 = 0.3;
const RIM_THICKNESS: f64 = 0.05;
const TRIGGER_DROP: f64 = 0.3;
const TRIGGER_SIZE: Vec3 = Vec3::new(0.5, 0.2, 0.5);

/// Invisible scoring volume. Never obstructs movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreTrigger {
    pub bounds: Aabb,
}

impl ScoreTrigger {
    /// World Z of the trigger centre; its sign tells the two hoops apart.
    pub fn center_z(&self) -> f64 {
        self.bounds.center().z
    }
}

#[derive(Debug, Clone)]
pub struct Court {
    collidables: Vec<Aabb>,
    triggers: Vec<ScoreTrigger>,
}

impl Default for Court {
    fn default() -> Self {
        Self::standard()
    }
}

impl Court {
    /// Regulation layout: floor, four walls, a hoop at each end.
    pub fn standard() -> Self {
        let mut court = Self {
            collidables: Vec::new(),
            triggers: Vec::new(),
        };

        // Floor, top face flush with y = 0
        court.add_box(
            vec3(0.0, -FLOOR_THICKNESS / 2.0, 0.0),
            vec3(COURT_WIDTH, FLOOR_THICKNESS, COURT_LENGTH),
        );

        // Side walls
        let side_x = COURT_WIDTH / 2.0 + WALL_THICKNESS / 2.0;
        let end_z = COURT_LENGTH / 2.0 + WALL_THICKNESS / 2.0;
        let end_width = COURT_WIDTH + 2.0 * WALL_THICKNESS;
        court.add_box(
            vec3(side_x, WALL_CENTER_Y, 0.0),
            vec3(WALL_THICKNESS, WALL_HEIGHT, COURT_LENGTH),
        );
        court.add_box(
            vec3(-side_x, WALL_CENTER_Y, 0.0),
            vec3(WALL_THICKNESS, WALL_HEIGHT, COURT_LENGTH),
        );
        // End walls
        court.add_box(
            vec3(0.0, WALL_CENTER_Y, -end_z),
            vec3(end_width, WALL_HEIGHT, WALL_THICKNESS),
        );
        court.add_box(
            vec3(0.0, WALL_CENTER_Y, end_z),
            vec3(end_width, WALL_HEIGHT, WALL_THICKNESS),
        );

        // Far hoop faces +Z, near hoop is its mirror image facing -Z
        court.add_hoop(vec3(0.0, 0.0, -HOOP_DISTANCE), 1.0);
        court.add_hoop(vec3(0.0, 0.0, HOOP_DISTANCE), -1.0);

        court
    }

    pub fn collidables(&self) -> &[Aabb] {
        &self.collidables
    }

    pub fn triggers(&self) -> &[ScoreTrigger] {
        &self.triggers
    }

    fn add_box(&mut self, center: Vec3, size: Vec3) {
        self.collidables.push(Aabb::from_center_size(center, size));
    }

    /// Post, backboard, a square rim of four thin segments, and the trigger.
    /// `facing` is +1 when the rim sticks out towards +Z.
    fn add_hoop(&mut self, base: Vec3, facing: f64) {
        self.add_box(
            vec3(base.x, 1.5, base.z - 0.5 * facing),
            vec3(0.3, 3.0, 0.3),
        );
        self.add_box(vec3(base.x, 3.0, base.z), vec3(1.8, 1.2, 0.1));

        let rim = vec3(base.x, RIM_HEIGHT, base.z + RIM_OFFSET * facing);
        let side = vec3(RIM_THICKNESS, RIM_THICKNESS, RIM_RADIUS * 2.0);
        let front = vec3(RIM_RADIUS * 2.0, RIM_THICKNESS, RIM_THICKNESS);
        self.add_box(vec3(rim.x - RIM_RADIUS, rim.y, rim.z), side);
        self.add_box(vec3(rim.x + RIM_RADIUS, rim.y, rim.z), side);
        self.add_box(vec3(rim.x, rim.y, rim.z - RIM_RADIUS), front);
        self.add_box(vec3(rim.x, rim.y, rim.z + RIM_RADIUS), front);

        self.triggers.push(ScoreTrigger {
            bounds: Aabb::from_center_size(
                vec3(rim.x, rim.y - TRIGGER_DROP, rim.z),
                TRIGGER_SIZE,
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_court_has_expected_pieces() {
        let court = Court::standard();
        // floor + 4 walls + 2 * (post + backboard + 4 rim segments)
        assert_eq!(court.collidables().len(), 17);
        assert_eq!(court.triggers().len(), 2);
    }

    #[test]
    fn floor_top_is_at_zero() {
        let court = Court::standard();
        let floor = court.collidables()[0];
        assert_eq!(floor.max.y, 0.0);
        assert_eq!(floor.min.x, -COURT_WIDTH / 2.0);
        assert_eq!(floor.max.z, COURT_LENGTH / 2.0);
    }

    #[test]
    fn walls_enclose_the_floor() {
        let court = Court::standard();
        let walls = &court.collidables()[1..5];
        assert_eq!(walls[0].min.x, COURT_WIDTH / 2.0);
        assert_eq!(walls[1].max.x, -COURT_WIDTH / 2.0);
        assert_eq!(walls[2].max.z, -COURT_LENGTH / 2.0);
        assert_eq!(walls[3].min.z, COURT_LENGTH / 2.0);
    }

    #[test]
    fn triggers_mirror_each_other() {
        let court = Court::standard();
        let far = court.triggers()[0];
        let near = court.triggers()[1];
        assert!(far.center_z() < 0.0);
        assert!(near.center_z() > 0.0);
        assert!((far.center_z() + near.center_z()).abs() < 1e-12);
        assert!((far.center_z() - (-HOOP_DISTANCE + RIM_OFFSET)).abs() < 1e-12);
    }

    #[test]
    fn trigger_sits_inside_rim_below_it() {
        let court = Court::standard();
        let trigger = court.triggers()[0].bounds;
        let center = trigger.center();
        assert!(center.y < RIM_HEIGHT);
        assert!((center.y - (RIM_HEIGHT - TRIGGER_DROP)).abs() < 1e-12);
        // The trigger is not solid
        assert!(!court.collidables().iter().any(|c| c.contains_point(center)));
    }
}
