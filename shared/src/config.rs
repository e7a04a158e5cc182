use crate::vec3::Vec3;
use ts_rs::TS;

/// Player movement tuning. Sent to clients so local prediction matches.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PlayerTuning {
    /// Horizontal speed cap when walking (units/s)
    pub move_speed: f64,
    pub sprint_multiplier: f64,
    /// Vertical velocity applied on jump (units/s)
    pub jump_impulse: f64,
    pub gravity: f64,
    /// Exponential damping on horizontal velocity (1/s)
    pub damping: f64,
    /// Horizontal acceleration while a direction is held (units/s^2)
    pub acceleration: f64,
    /// Full width of the body box on X and Z
    pub width: f64,
    /// Body height; the tracked position is the top of the box
    pub height: f64,
    pub spawn_position: Vec3,
    /// Bodies below this height are teleported back to spawn
    pub kill_plane_y: f64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            sprint_multiplier: 1.7,
            jump_impulse: 12.0,
            gravity: 30.0,
            damping: 10.0,
            acceleration: 200.0,
            width: 0.6,
            height: 1.6,
            spawn_position: Vec3::new(0.0, 5.0, 0.0),
            kill_plane_y: -20.0,
        }
    }
}

impl PlayerTuning {
    /// Highest horizontal speed a body may reach.
    pub fn max_horizontal_speed(&self) -> f64 {
        self.move_speed * self.sprint_multiplier.max(1.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.move_speed.is_finite() || self.move_speed <= 0.0 {
            return Err("move_speed must be finite and > 0".to_string());
        }
        if !self.sprint_multiplier.is_finite() || self.sprint_multiplier < 1.0 {
            return Err("sprint_multiplier must be finite and >= 1".to_string());
        }
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err("gravity must be finite and >= 0".to_string());
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err("damping must be finite and >= 0".to_string());
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err("width must be finite and > 0".to_string());
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err("height must be finite and > 0".to_string());
        }
        if !self.spawn_position.is_finite() || self.spawn_position.y <= self.kill_plane_y {
            return Err("spawn_position must be finite and above kill_plane_y".to_string());
        }
        Ok(())
    }
}

/// Free-flight ball tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct BallTuning {
    pub radius: f64,
    pub gravity: f64,
    /// Horizontal drag (1/s)
    pub drag: f64,
    /// Height of the ball centre when it touches the court
    pub floor_contact_y: f64,
    pub floor_restitution: f64,
    pub wall_restitution: f64,
    /// Rebounds slower than this (units/s) come to rest
    pub rest_threshold: f64,
    pub spawn_position: Vec3,
    /// Ball centre is kept within |x| <= half_extent_x - radius
    pub half_extent_x: f64,
    /// Ball centre is kept within |z| <= half_extent_z - radius
    pub half_extent_z: f64,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            radius: 0.25,
            gravity: 9.8,
            drag: 0.5,
            floor_contact_y: 0.5,
            floor_restitution: 0.7,
            wall_restitution: 0.8,
            rest_threshold: 1.0,
            spawn_position: Vec3::new(0.0, 5.0, 0.0),
            half_extent_x: 10.0,
            half_extent_z: 17.0,
        }
    }
}

impl BallTuning {
    pub fn validate(&self) -> Result<(), String> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err("radius must be finite and > 0".to_string());
        }
        for (name, value) in [
            ("floor_restitution", self.floor_restitution),
            ("wall_restitution", self.wall_restitution),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1]", name));
            }
        }
        if !self.rest_threshold.is_finite() || self.rest_threshold < 0.0 {
            return Err("rest_threshold must be finite and >= 0".to_string());
        }
        if self.half_extent_x <= self.radius || self.half_extent_z <= self.radius {
            return Err("court half extents must exceed the ball radius".to_string());
        }
        if !self.spawn_position.is_finite() {
            return Err("spawn_position must be finite".to_string());
        }
        Ok(())
    }
}

/// All simulation constants shared by server and clients.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PhysicsConfig {
    pub player: PlayerTuning,
    pub ball: BallTuning,
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.player.validate().map_err(|e| format!("player: {}", e))?;
        self.ball.validate().map_err(|e| format!("ball: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_physics_config_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
    }

    #[test]
    fn sprint_multiplier_below_one_invalid() {
        let mut config = PhysicsConfig::default();
        config.player.sprint_multiplier = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("player:"), "unexpected error: {}", err);
    }

    #[test]
    fn restitution_above_one_invalid() {
        let mut config = PhysicsConfig::default();
        config.ball.floor_restitution = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn spawn_below_kill_plane_invalid() {
        let mut tuning = PlayerTuning::default();
        tuning.spawn_position.y = -30.0;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn max_speed_includes_sprint() {
        let tuning = PlayerTuning::default();
        assert!((tuning.max_horizontal_speed() - 10.2).abs() < 1e-9);
    }
}
