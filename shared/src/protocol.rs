use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::config::PhysicsConfig;
use crate::quat::Quat;
use crate::vec3::Vec3;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Connection-scoped identifier assigned by the server.
pub type SessionId = u32;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "init")]
    Init(InitMsg),
    #[serde(rename = "player_joined")]
    PlayerJoined(PlayerJoinedMsg),
    #[serde(rename = "world_state")]
    WorldState(WorldStateMsg),
    #[serde(rename = "player_left")]
    PlayerLeft(PlayerLeftMsg),
    #[serde(rename = "ball_updated")]
    BallUpdated(BallUpdatedMsg),
    #[serde(rename = "scored")]
    Scored(ScoredMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct InitMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: SessionId,
    pub lobby_id: String,
    pub start_position: Vec3,
    pub players: BTreeMap<SessionId, PlayerWire>,
    pub ball_state: BallWire,
    pub score: ScoreWire,
    pub config: PhysicsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PlayerWire {
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PlayerJoinedMsg {
    pub id: SessionId,
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct WorldStateMsg {
    /// Per-lobby tick counter; only advances on simulated ticks
    #[ts(type = "number")]
    pub tick: u64,
    pub players: BTreeMap<SessionId, PlayerWire>,
    pub ball_state: BallWire,
    pub score: ScoreWire,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PlayerLeftMsg {
    pub id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct BallWire {
    pub owner_id: Option<SessionId>,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct BallUpdatedMsg {
    pub ball_state: BallWire,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct ScoreWire {
    pub home: u32,
    pub away: u32,
}

/// Which side a score is credited to. `Home` attacks the far hoop (negative Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct ScoredMsg {
    pub team: Team,
    pub home: u32,
    pub away: u32,
}

/// One row of the `GET /api/lobbies` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct LobbySummary {
    pub id: String,
    #[ts(type = "number")]
    pub count: usize,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "join")]
    Join { lobby_id: String },
    #[serde(rename = "input")]
    Input(InputMsg),
    #[serde(rename = "ball_update")]
    BallUpdate(BallUpdateMsg),
    #[serde(rename = "claim_ball")]
    ClaimBall,
    #[serde(rename = "release_ball")]
    ReleaseBall(ReleaseBallMsg),
}

/// Partial input update. Absent fields leave the stored value unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct InputMsg {
    #[serde(default)]
    pub inputs: InputFlags,
    #[serde(default)]
    pub orientation: Option<Quat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct InputFlags {
    #[serde(default)]
    pub forward: Option<bool>,
    #[serde(default)]
    pub backward: Option<bool>,
    #[serde(default)]
    pub left: Option<bool>,
    #[serde(default)]
    pub right: Option<bool>,
    #[serde(default)]
    pub jump: Option<bool>,
    #[serde(default)]
    pub sprint: Option<bool>,
}

/// Field-level ball merge. `owner_id` is tri-state: absent leaves the owner
/// unchanged, `null` releases, a number claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct BallUpdateMsg {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub owner_id: Option<Option<SessionId>>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub velocity: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct ReleaseBallMsg {
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub velocity: Option<Vec3>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// === Conversion helpers ===

/// Round to 4 decimal places (plenty for positions and unit quaternions, halves JSON size)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

pub fn round_vec3(v: Vec3) -> Vec3 {
    Vec3::new(round4(v.x), round4(v.y), round4(v.z))
}

pub fn round_quat(q: Quat) -> Quat {
    Quat::new(round4(q.x), round4(q.y), round4(q.z), round4(q.w))
}
