use std::collections::HashMap;
use std::time::{Duration, Instant};

use hoops_shared::config::PhysicsConfig;
use hoops_shared::protocol::LobbySummary;

use crate::config::ServerConfig;
use crate::lobby::Lobby;

/// Longest lobby id kept; longer ids are truncated.
pub const MAX_LOBBY_ID_CHARS: usize = 64;

/// Trim and bound a client-supplied lobby id. Blank ids are rejected.
pub fn normalize_lobby_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_LOBBY_ID_CHARS).collect())
}

/// Every live lobby, keyed by id. Lobbies are created on first join.
pub struct LobbyRegistry {
    lobbies: HashMap<String, Lobby>,
    physics: PhysicsConfig,
    score_reset_delay: f64,
    broadcast_capacity: usize,
}

impl LobbyRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            lobbies: HashMap::new(),
            physics: config.physics,
            score_reset_delay: config.score_reset_delay_secs,
            broadcast_capacity: config.broadcast_capacity,
        }
    }

    pub fn get_or_create(&mut self, id: &str, now: Instant) -> &mut Lobby {
        let physics = self.physics;
        let delay = self.score_reset_delay;
        let capacity = self.broadcast_capacity;
        self.lobbies.entry(id.to_string()).or_insert_with(|| {
            tracing::info!("Created lobby {}", id);
            Lobby::new(id.to_string(), physics, delay, capacity, now)
        })
    }

    pub fn get(&self, id: &str) -> Option<&Lobby> {
        self.lobbies.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn lobbies_mut(&mut self) -> impl Iterator<Item = &mut Lobby> {
        self.lobbies.values_mut()
    }

    /// Id and player count of every lobby, ordered by id.
    pub fn list(&self) -> Vec<LobbySummary> {
        let mut out: Vec<LobbySummary> = self.lobbies.values().map(Lobby::summary).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Drop lobbies that have had no players for at least `ttl`.
    /// Returns the removed ids.
    pub fn prune_empty(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let mut removed = Vec::new();
        self.lobbies.retain(|id, lobby| {
            let expired = lobby
                .emptied_at()
                .is_some_and(|since| now.saturating_duration_since(since) >= ttl);
            if expired {
                removed.push(id.clone());
            }
            !expired
        });
        removed
    }
}
