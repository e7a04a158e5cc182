//! The lobby's single shared ball.
//!
//! Authority is split: while `owner` is `None` the server integrates the ball
//! each tick; while a session owns it, that session's reports are taken
//! verbatim and the server only republishes them. Ownership changes hands via
//! `claim`, `release`, or a field-level `apply_update`.

use crate::aabb::Aabb;
use hoops_shared::config::BallTuning;
use hoops_shared::protocol::{round_vec3, BallUpdateMsg, BallWire, SessionId};
use hoops_shared::vec3::{vec3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub owner: Option<SessionId>,
}

/// Why a client-driven ball change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallAuthority {
    /// Another session holds the ball
    HeldBy(SessionId),
    /// The sender tried to hand ownership to someone else
    ForeignOwner(SessionId),
    /// The sender does not hold the ball and is not picking it up
    NotOwner,
}

impl BallState {
    pub fn at_spawn(tuning: &BallTuning) -> Self {
        Self {
            position: tuning.spawn_position,
            velocity: Vec3::ZERO,
            owner: None,
        }
    }

    /// Back to the spawn pose with no owner.
    pub fn reset(&mut self, tuning: &BallTuning) {
        *self = Self::at_spawn(tuning);
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    pub fn bounds(&self, tuning: &BallTuning) -> Aabb {
        let r = tuning.radius;
        Aabb::from_center_size(self.position, vec3(r * 2.0, r * 2.0, r * 2.0))
    }

    /// Free-flight step. Does nothing while the ball is owned.
    pub fn integrate(&mut self, delta: f64, tuning: &BallTuning) {
        if self.is_owned() {
            return;
        }

        self.velocity.y -= tuning.gravity * delta;
        self.velocity.x -= self.velocity.x * tuning.drag * delta;
        self.velocity.z -= self.velocity.z * tuning.drag * delta;

        self.position.x += self.velocity.x * delta;
        self.position.y += self.velocity.y * delta;
        self.position.z += self.velocity.z * delta;

        if self.position.y < tuning.floor_contact_y {
            self.position.y = tuning.floor_contact_y;
            if self.velocity.y < 0.0 {
                self.velocity.y = -self.velocity.y * tuning.floor_restitution;
                if self.velocity.y < tuning.rest_threshold {
                    self.velocity.y = 0.0;
                }
            }
        }

        let limit_x = tuning.half_extent_x - tuning.radius;
        let limit_z = tuning.half_extent_z - tuning.radius;
        bounce_axis(
            &mut self.position.x,
            &mut self.velocity.x,
            limit_x,
            tuning.wall_restitution,
        );
        bounce_axis(
            &mut self.position.z,
            &mut self.velocity.z,
            limit_z,
            tuning.wall_restitution,
        );
    }

    /// Take the ball if nobody holds it. Re-claiming your own ball succeeds.
    pub fn claim(&mut self, session: SessionId) -> Result<(), BallAuthority> {
        match self.owner {
            Some(holder) if holder != session => Err(BallAuthority::HeldBy(holder)),
            _ => {
                self.owner = Some(session);
                Ok(())
            }
        }
    }

    /// Let go of the ball, optionally with a final pose. The server takes over
    /// integration from whatever state results.
    pub fn release(
        &mut self,
        session: SessionId,
        position: Option<Vec3>,
        velocity: Option<Vec3>,
    ) -> Result<(), BallAuthority> {
        if self.owner != Some(session) {
            return Err(BallAuthority::NotOwner);
        }
        self.merge_pose(position, velocity);
        self.owner = None;
        Ok(())
    }

    /// Field-level merge of a client report. Accepted from the holder, or
    /// from a sender picking up a free ball by naming itself as owner.
    pub fn apply_update(
        &mut self,
        sender: SessionId,
        update: &BallUpdateMsg,
    ) -> Result<(), BallAuthority> {
        if let Some(Some(named)) = update.owner_id {
            if named != sender {
                return Err(BallAuthority::ForeignOwner(named));
            }
        }
        match self.owner {
            Some(holder) if holder != sender => return Err(BallAuthority::HeldBy(holder)),
            None if update.owner_id != Some(Some(sender)) => {
                return Err(BallAuthority::NotOwner)
            }
            _ => {}
        }

        self.merge_pose(update.position, update.velocity);
        if let Some(owner) = update.owner_id {
            self.owner = owner;
        }
        Ok(())
    }

    fn merge_pose(&mut self, position: Option<Vec3>, velocity: Option<Vec3>) {
        if let Some(p) = position.filter(Vec3::is_finite) {
            self.position = p;
        }
        if let Some(v) = velocity.filter(Vec3::is_finite) {
            self.velocity = v;
        }
    }

    pub fn to_wire(&self) -> BallWire {
        BallWire {
            owner_id: self.owner,
            position: round_vec3(self.position),
            velocity: round_vec3(self.velocity),
        }
    }
}

/// Reflect one horizontal component off the symmetric bounds `±limit`.
fn bounce_axis(position: &mut f64, velocity: &mut f64, limit: f64, restitution: f64) {
    if *position > limit {
        *position = limit;
        if *velocity > 0.0 {
            *velocity = -*velocity * restitution;
        }
    } else if *position < -limit {
        *position = -limit;
        if *velocity < 0.0 {
            *velocity = -*velocity * restitution;
        }
    }
}
