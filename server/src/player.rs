use crate::aabb::{min_penetration_axis, Aabb, Axis};
use hoops_shared::config::PlayerTuning;
use hoops_shared::protocol::{
    round_quat, round_vec3, InputFlags, InputMsg, PlayerJoinedMsg, PlayerWire, SessionId,
};
use hoops_shared::quat::{self, Quat};
use hoops_shared::vec3::{horizontal_length, normalize, vec3, Vec3};

/// Overlaps thinner than this on any axis are treated as resting contact.
pub const CONTACT_EPSILON: f64 = 0.001;

/// Latest known state of a player's controls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,
}

impl InputState {
    /// Overwrite only the flags present in `flags`.
    pub fn merge(&mut self, flags: &InputFlags) {
        let fields = [
            (&mut self.forward, flags.forward),
            (&mut self.backward, flags.backward),
            (&mut self.left, flags.left),
            (&mut self.right, flags.right),
            (&mut self.jump, flags.jump),
            (&mut self.sprint, flags.sprint),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Server-side physics body for one connected session.
///
/// `position` is the top of the body's box (eye height); the box extends
/// `height` below it and `width / 2` to each side on X and Z.
#[derive(Debug, Clone)]
pub struct PlayerBody {
    pub id: SessionId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Client-reported facing; drives movement direction
    pub orientation: Quat,
    pub inputs: InputState,
    pub grounded: bool,
    tuning: PlayerTuning,
}

impl PlayerBody {
    pub fn new(id: SessionId, tuning: PlayerTuning) -> Self {
        Self {
            id,
            position: tuning.spawn_position,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            inputs: InputState::default(),
            grounded: false,
            tuning,
        }
    }

    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    /// Merge a partial input message. Missing flags keep their value, and an
    /// orientation that cannot be normalized is dropped.
    pub fn set_inputs(&mut self, msg: &InputMsg) {
        self.inputs.merge(&msg.inputs);
        if let Some(q) = msg.orientation.and_then(|q| q.normalized()) {
            self.orientation = q;
        }
    }

    /// Current world-space box.
    pub fn bounds(&self) -> Aabb {
        let w = self.tuning.width / 2.0;
        let p = self.position;
        Aabb::new(
            vec3(p.x - w, p.y - self.tuning.height, p.z - w),
            vec3(p.x + w, p.y, p.z + w),
        )
    }

    /// Advance the body by `delta` seconds against static `collidables`.
    pub fn integrate(&mut self, delta: f64, collidables: &[Aabb]) {
        let t = self.tuning;

        // Damping and gravity
        self.velocity.x -= self.velocity.x * t.damping * delta;
        self.velocity.z -= self.velocity.z * t.damping * delta;
        self.velocity.y -= t.gravity * delta;

        // Steering from the client's facing, flattened onto the ground plane
        let dir = self.wish_direction();
        if dir != Vec3::ZERO {
            self.velocity.x += dir.x * t.acceleration * delta;
            self.velocity.z += dir.z * t.acceleration * delta;
        }

        let cap = t.move_speed
            * if self.inputs.sprint {
                t.sprint_multiplier
            } else {
                1.0
            };
        let speed = horizontal_length(self.velocity);
        if speed > cap {
            let ratio = cap / speed;
            self.velocity.x *= ratio;
            self.velocity.z *= ratio;
        }

        if self.inputs.jump && self.grounded {
            self.velocity.y = t.jump_impulse;
            self.inputs.jump = false;
        }

        self.grounded = false;

        self.position.x += self.velocity.x * delta;
        self.resolve_collisions(collidables, Axis::X);

        self.position.z += self.velocity.z * delta;
        self.resolve_collisions(collidables, Axis::Z);

        self.position.y += self.velocity.y * delta;
        self.resolve_collisions(collidables, Axis::Y);
        self.resolve_residual(collidables);

        if self.position.y < t.kill_plane_y {
            self.position = t.spawn_position;
            self.velocity = Vec3::ZERO;
        }
    }

    /// Unit ground-plane direction requested by the directional flags, or zero.
    pub fn wish_direction(&self) -> Vec3 {
        let forward = flatten(quat::rotate(self.orientation, vec3(0.0, 0.0, -1.0)));
        let right = flatten(quat::rotate(self.orientation, vec3(1.0, 0.0, 0.0)));

        let mut dir = Vec3::ZERO;
        if self.inputs.forward {
            dir.x += forward.x;
            dir.z += forward.z;
        }
        if self.inputs.backward {
            dir.x -= forward.x;
            dir.z -= forward.z;
        }
        if self.inputs.right {
            dir.x += right.x;
            dir.z += right.z;
        }
        if self.inputs.left {
            dir.x -= right.x;
            dir.z -= right.z;
        }
        normalize(dir)
    }

    /// Push the body out of every collidable whose shallowest penetration is
    /// along `axis`, zeroing velocity on that axis.
    pub fn resolve_collisions(&mut self, collidables: &[Aabb], axis: Axis) {
        for solid in collidables {
            let body = self.bounds();
            if !body.intersects(solid) {
                continue;
            }
            let overlap = body.overlap(solid);
            if is_resting_contact(overlap) || min_penetration_axis(overlap) != axis {
                continue;
            }
            self.push_out(axis, overlap, &body, solid);
        }
    }

    /// Clear any penetration the per-axis passes left behind, along each
    /// overlap's shallowest axis.
    pub fn resolve_residual(&mut self, collidables: &[Aabb]) {
        for solid in collidables {
            let body = self.bounds();
            if !body.intersects(solid) {
                continue;
            }
            let overlap = body.overlap(solid);
            if is_resting_contact(overlap) {
                continue;
            }
            self.push_out(min_penetration_axis(overlap), overlap, &body, solid);
        }
    }

    fn push_out(&mut self, axis: Axis, overlap: Vec3, body: &Aabb, solid: &Aabb) {
        let center_offset = axis.of(body.center()) - axis.of(solid.center());
        match axis {
            Axis::X => {
                self.position.x += overlap.x * push_sign(self.velocity.x, center_offset);
                self.velocity.x = 0.0;
            }
            Axis::Z => {
                self.position.z += overlap.z * push_sign(self.velocity.z, center_offset);
                self.velocity.z = 0.0;
            }
            Axis::Y => {
                let falling = if self.velocity.y != 0.0 {
                    self.velocity.y < 0.0
                } else {
                    center_offset >= 0.0
                };
                if falling {
                    self.position.y += overlap.y;
                    self.grounded = true;
                } else {
                    self.position.y -= overlap.y;
                }
                self.velocity.y = 0.0;
            }
        }
    }

    pub fn to_wire(&self) -> PlayerWire {
        PlayerWire {
            position: round_vec3(self.position),
            orientation: round_quat(self.orientation),
        }
    }

    pub fn joined_msg(&self) -> PlayerJoinedMsg {
        PlayerJoinedMsg {
            id: self.id,
            position: round_vec3(self.position),
            orientation: round_quat(self.orientation),
        }
    }
}

/// Direction to push along one axis: against the motion when moving,
/// otherwise away from the obstacle's centre.
fn push_sign(velocity: f64, center_offset: f64) -> f64 {
    if velocity != 0.0 {
        -velocity.signum()
    } else {
        center_offset.signum()
    }
}

fn is_resting_contact(overlap: Vec3) -> bool {
    overlap.x.abs() < CONTACT_EPSILON
        || overlap.y.abs() < CONTACT_EPSILON
        || overlap.z.abs() < CONTACT_EPSILON
}

fn flatten(v: Vec3) -> Vec3 {
    normalize(vec3(v.x, 0.0, v.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::court::Court;
    use hoops_shared::vec3::length;
    use std::f64::consts::PI;

    const DT: f64 = 1.0 / 60.0;

    fn body() -> PlayerBody {
        PlayerBody::new(1, PlayerTuning::default())
    }

    fn hold(flags: InputFlags) -> InputMsg {
        InputMsg {
            inputs: flags,
            orientation: None,
        }
    }

    fn forward() -> InputFlags {
        InputFlags {
            forward: Some(true),
            ..Default::default()
        }
    }

    fn assert_contained(body: &PlayerBody, collidables: &[Aabb]) {
        let b = body.bounds();
        for solid in collidables {
            if !b.intersects(solid) {
                continue;
            }
            let o = b.overlap(solid);
            let depth = o.x.min(o.y).min(o.z);
            assert!(
                depth <= CONTACT_EPSILON,
                "body {:?} penetrates {:?} by {}",
                b,
                solid,
                depth
            );
        }
    }

    /// Let a body fall onto the standard court floor and settle.
    fn settled_on_court(court: &Court) -> PlayerBody {
        let mut p = body();
        for _ in 0..120 {
            p.integrate(DT, court.collidables());
        }
        p
    }

    #[test]
    fn partial_inputs_leave_other_flags_alone() {
        let mut p = body();
        p.set_inputs(&hold(InputFlags {
            forward: Some(true),
            sprint: Some(true),
            ..Default::default()
        }));
        p.set_inputs(&hold(InputFlags {
            sprint: Some(false),
            ..Default::default()
        }));
        assert!(p.inputs.forward);
        assert!(!p.inputs.sprint);
    }

    #[test]
    fn invalid_orientation_is_ignored() {
        let mut p = body();
        let yaw = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI / 2.0);
        p.set_inputs(&InputMsg {
            inputs: InputFlags::default(),
            orientation: Some(yaw),
        });
        p.set_inputs(&InputMsg {
            inputs: InputFlags::default(),
            orientation: Some(Quat::new(0.0, 0.0, 0.0, 0.0)),
        });
        assert!((p.orientation.y - yaw.y).abs() < 1e-12);
    }

    #[test]
    fn orientation_is_renormalized() {
        let mut p = body();
        p.set_inputs(&InputMsg {
            inputs: InputFlags::default(),
            orientation: Some(Quat::new(0.0, 0.0, 0.0, 3.0)),
        });
        assert_eq!(p.orientation, Quat::IDENTITY);
    }

    #[test]
    fn wish_direction_follows_facing() {
        let mut p = body();
        p.inputs.forward = true;
        let d = p.wish_direction();
        assert!((d.z + 1.0).abs() < 1e-12 && d.x.abs() < 1e-12);

        p.orientation = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI / 2.0);
        let d = p.wish_direction();
        assert!((d.x + 1.0).abs() < 1e-9 && d.z.abs() < 1e-9);
    }

    #[test]
    fn diagonal_wish_direction_is_unit() {
        let mut p = body();
        p.inputs.forward = true;
        p.inputs.right = true;
        assert!((length(p.wish_direction()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposing_flags_cancel() {
        let mut p = body();
        p.inputs.forward = true;
        p.inputs.backward = true;
        assert_eq!(p.wish_direction(), Vec3::ZERO);
    }

    #[test]
    fn looking_down_still_walks_forward() {
        let mut p = body();
        p.orientation = Quat::from_axis_angle(vec3(1.0, 0.0, 0.0), -PI / 3.0);
        p.inputs.forward = true;
        let d = p.wish_direction();
        assert!(d.y == 0.0 && (d.z + 1.0).abs() < 1e-9);
    }

    #[test]
    fn holding_forward_for_one_second_covers_base_speed() {
        let mut p = body();
        p.set_inputs(&hold(forward()));
        let start = p.position;
        for _ in 0..60 {
            p.integrate(DT, &[]);
        }
        let dz = start.z - p.position.z;
        assert!(
            dz > 5.8 && dz <= 6.0 + 1e-9,
            "forward displacement {} not close to 6.0",
            dz
        );
        assert!((p.position.x - start.x).abs() < 1e-12);
    }

    #[test]
    fn horizontal_speed_never_exceeds_sprint_cap() {
        let cap = PlayerTuning::default().max_horizontal_speed();
        for mask in 0u8..64 {
            let mut p = body();
            p.orientation = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), mask as f64 * 0.37);
            p.set_inputs(&hold(InputFlags {
                forward: Some(mask & 1 != 0),
                backward: Some(mask & 2 != 0),
                left: Some(mask & 4 != 0),
                right: Some(mask & 8 != 0),
                jump: Some(mask & 16 != 0),
                sprint: Some(mask & 32 != 0),
            }));
            for _ in 0..90 {
                p.integrate(DT, &[]);
                let speed = horizontal_length(p.velocity);
                assert!(speed <= cap + 1e-9, "mask {} reached {}", mask, speed);
            }
        }
    }

    #[test]
    fn walking_speed_respects_walk_cap() {
        let mut p = body();
        p.set_inputs(&hold(forward()));
        for _ in 0..30 {
            p.integrate(DT, &[]);
            assert!(horizontal_length(p.velocity) <= 6.0 + 1e-9);
        }
    }

    #[test]
    fn identical_inputs_give_identical_trajectories() {
        let script = |step: usize| InputFlags {
            forward: Some(step % 40 < 25),
            left: Some(step % 17 < 5),
            jump: Some(step % 50 == 0),
            sprint: Some(step % 90 > 60),
            ..Default::default()
        };
        let court = Court::standard();
        let mut a = body();
        let mut b = body();
        for step in 0..300 {
            let msg = InputMsg {
                inputs: script(step),
                orientation: Some(Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), step as f64 * 0.01)),
            };
            a.set_inputs(&msg);
            b.set_inputs(&msg);
            let dt = if step % 3 == 0 { 0.02 } else { DT };
            a.integrate(dt, court.collidables());
            b.integrate(dt, court.collidables());
            assert_eq!(a.position, b.position);
            assert_eq!(a.velocity, b.velocity);
        }
    }

    #[test]
    fn lands_on_floor_and_becomes_grounded() {
        let court = Court::standard();
        let p = settled_on_court(&court);
        assert!(p.grounded);
        let feet = p.position.y - p.tuning().height;
        assert!(feet.abs() < 0.01, "feet at {}", feet);
        assert_contained(&p, court.collidables());
    }

    #[test]
    fn jump_requires_ground_and_is_consumed() {
        let court = Court::standard();
        let mut p = body();
        p.set_inputs(&hold(InputFlags {
            jump: Some(true),
            ..Default::default()
        }));
        // Airborne: the flag stays pending
        p.integrate(DT, court.collidables());
        assert!(p.inputs.jump);

        let mut jumped = false;
        for _ in 0..120 {
            p.integrate(DT, court.collidables());
            if p.velocity.y > 0.0 {
                jumped = true;
                break;
            }
        }
        assert!(jumped, "body never jumped after landing");
        assert!(!p.inputs.jump, "jump flag should be consumed");
    }

    #[test]
    fn held_jump_does_not_repeat_without_new_input() {
        let court = Court::standard();
        let mut p = settled_on_court(&court);
        p.set_inputs(&hold(InputFlags {
            jump: Some(true),
            ..Default::default()
        }));
        p.integrate(DT, court.collidables());
        assert!(p.velocity.y > 0.0);
        for _ in 0..240 {
            p.integrate(DT, court.collidables());
        }
        assert!(p.grounded);
        assert!(p.velocity.y <= 0.0);
    }

    #[test]
    fn head_hitting_ceiling_stops_upward_motion() {
        let ceiling = Aabb::new(vec3(-5.0, 3.0, -5.0), vec3(5.0, 4.0, 5.0));
        let mut p = body();
        p.position = vec3(0.0, 2.9, 0.0);
        p.velocity = vec3(0.0, 12.0, 0.0);
        p.integrate(DT, &[ceiling]);
        assert_eq!(p.velocity.y, 0.0);
        assert!(!p.grounded);
        assert!(p.position.y <= 3.0 + 1e-9);
    }

    #[test]
    fn running_into_wall_is_contained_on_x() {
        let court = Court::standard();
        let mut p = settled_on_court(&court);
        p.orientation = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), -PI / 2.0);
        p.set_inputs(&hold(InputFlags {
            forward: Some(true),
            sprint: Some(true),
            ..Default::default()
        }));
        for _ in 0..240 {
            p.integrate(DT, court.collidables());
            assert_contained(&p, court.collidables());
        }
        let half_width = p.tuning().width / 2.0;
        assert!(p.position.x + half_width <= 10.0 + CONTACT_EPSILON);
        assert!(p.position.x > 9.0, "body should reach the +X wall");
    }

    #[test]
    fn running_into_end_wall_is_contained_on_z() {
        let court = Court::standard();
        let mut p = settled_on_court(&court);
        p.position.x = 5.0;
        p.orientation = Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), PI);
        p.set_inputs(&hold(forward()));
        for _ in 0..360 {
            p.integrate(DT, court.collidables());
            assert_contained(&p, court.collidables());
        }
        assert!(p.position.z > 16.0);
        assert!(p.position.z + p.tuning().width / 2.0 <= 17.0 + CONTACT_EPSILON);
    }

    #[test]
    fn stationary_overlap_pushes_away_from_centre() {
        let block = Aabb::from_center_size(vec3(1.0, 0.8, 0.0), vec3(1.0, 4.0, 4.0));
        let mut p = body();
        p.position = vec3(0.3, 1.6, 0.0);
        p.velocity = Vec3::ZERO;
        p.resolve_collisions(&[block], Axis::X);
        assert!(p.position.x < 0.3);
        assert_contained(&p, &[block]);
    }

    #[test]
    fn diagonal_run_at_post_corner_is_contained() {
        let post = Aabb::from_center_size(vec3(0.0, 0.8, 0.0), vec3(1.0, 4.0, 1.0));
        let mut p = body();
        p.position = vec3(-0.81, 1.6, -0.75);
        p.velocity = vec3(9.0, 0.0, 9.0);
        for _ in 0..10 {
            p.integrate(DT, &[post]);
            assert_contained(&p, &[post]);
        }
    }

    #[test]
    fn residual_pass_uses_shallowest_axis() {
        let block = Aabb::from_center_size(vec3(0.0, 0.8, 0.0), vec3(1.0, 4.0, 1.0));
        let mut p = body();
        p.position = vec3(-0.7, 1.6, -0.3);
        p.velocity = vec3(3.0, 0.0, 3.0);
        p.resolve_residual(&[block]);
        assert_contained(&p, &[block]);
        assert_eq!(p.velocity.x, 0.0);
        assert_eq!(p.velocity.z, 3.0);
    }

    #[test]
    fn falling_through_the_world_respawns() {
        let mut p = body();
        p.position = vec3(3.0, -19.99, 2.0);
        p.velocity = vec3(1.0, -20.0, 0.0);
        p.integrate(DT, &[]);
        assert_eq!(p.position, PlayerTuning::default().spawn_position);
        assert_eq!(p.velocity, Vec3::ZERO);
    }

    #[test]
    fn wire_form_rounds_position() {
        let mut p = body();
        p.position = vec3(1.234_56, 1.6, -0.000_01);
        let wire = p.to_wire();
        assert_eq!(wire.position, vec3(1.2346, 1.6, 0.0));
        assert_eq!(p.joined_msg().id, 1);
    }
}
