use hoops_shared::config::PhysicsConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Frames longer than this are skipped rather than integrated (seconds)
    pub max_tick_delta_secs: f64,
    /// Simulated time between a basket and the ball respawn (seconds)
    pub score_reset_delay_secs: f64,
    pub command_capacity: usize,
    /// Per-lobby broadcast buffer; slow clients beyond this drop snapshots
    pub broadcast_capacity: usize,
    /// Inbound text frames larger than this are ignored
    pub max_message_bytes: usize,
    /// Remove lobbies that stayed empty this long. `None` keeps them forever.
    pub empty_lobby_ttl_secs: Option<u64>,
    /// Movement and ball tuning shared by every lobby
    pub physics: PhysicsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_rate_hz: 60,
            max_tick_delta_secs: 0.1,
            score_reset_delay_secs: 1.0,
            command_capacity: 1024,
            broadcast_capacity: 64,
            max_message_bytes: 16 * 1024,
            empty_lobby_ttl_secs: None,
            physics: PhysicsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT` and `HOOPS_EMPTY_LOBBY_TTL_SECS`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {:?}", port))?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        }

        if let Ok(ttl) = std::env::var("HOOPS_EMPTY_LOBBY_TTL_SECS") {
            let ttl: u64 = ttl.trim().parse().map_err(|_| {
                format!(
                    "HOOPS_EMPTY_LOBBY_TTL_SECS must be whole seconds, got {:?}",
                    ttl
                )
            })?;
            config.empty_lobby_ttl_secs = Some(ttl);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err(format!(
                "tick_rate_hz must be in 1..=1000, got {}",
                self.tick_rate_hz
            ));
        }
        let period = 1.0 / self.tick_rate_hz as f64;
        if !self.max_tick_delta_secs.is_finite() || self.max_tick_delta_secs < period {
            return Err(format!(
                "max_tick_delta_secs must be at least one tick period ({:.4}s), got {}",
                period, self.max_tick_delta_secs
            ));
        }
        if !self.score_reset_delay_secs.is_finite() || self.score_reset_delay_secs < 0.0 {
            return Err(format!(
                "score_reset_delay_secs must be non-negative, got {}",
                self.score_reset_delay_secs
            ));
        }
        if self.command_capacity == 0 {
            return Err("command_capacity must be positive".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be positive".to_string());
        }
        if self.max_message_bytes < 64 {
            return Err(format!(
                "max_message_bytes must be at least 64, got {}",
                self.max_message_bytes
            ));
        }
        self.physics.validate()
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}
