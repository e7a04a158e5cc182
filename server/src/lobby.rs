use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use hoops_shared::config::PhysicsConfig;
use hoops_shared::protocol::{
    BallUpdateMsg, BallUpdatedMsg, InitMsg, InputMsg, LobbySummary, PlayerJoinedMsg,
    PlayerLeftMsg, ReleaseBallMsg, ScoredMsg, ServerMsg, SessionId, WorldStateMsg,
    PROTOCOL_VERSION,
};
use tokio::sync::broadcast;

use crate::ball::{BallAuthority, BallState};
use crate::court::Court;
use crate::player::PlayerBody;
use crate::scoring::{Scoreboard, ScoringEvaluator};

/// Events fanned out to every connection in one lobby
#[derive(Debug, Clone)]
pub enum LobbyBroadcast {
    WorldState(WorldStateMsg),
    PlayerJoined(PlayerJoinedMsg),
    PlayerLeft(PlayerLeftMsg),
    BallUpdated(BallUpdatedMsg),
    Scored(ScoredMsg),
}

impl From<LobbyBroadcast> for ServerMsg {
    fn from(event: LobbyBroadcast) -> Self {
        match event {
            LobbyBroadcast::WorldState(msg) => ServerMsg::WorldState(msg),
            LobbyBroadcast::PlayerJoined(msg) => ServerMsg::PlayerJoined(msg),
            LobbyBroadcast::PlayerLeft(msg) => ServerMsg::PlayerLeft(msg),
            LobbyBroadcast::BallUpdated(msg) => ServerMsg::BallUpdated(msg),
            LobbyBroadcast::Scored(msg) => ServerMsg::Scored(msg),
        }
    }
}

/// Result of offering a lobby one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The gap since the previous tick exceeded the lag guard; nothing moved
    Skipped { delta: f64 },
    /// No players; nothing to simulate or send
    Idle,
    Advanced { delta: f64 },
}

/// Why a ball command from a session was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallRejected {
    NotInLobby,
    Authority(BallAuthority),
}

impl From<BallAuthority> for BallRejected {
    fn from(err: BallAuthority) -> Self {
        BallRejected::Authority(err)
    }
}

/// One independent match: its players, ball, court and score.
///
/// Owned by the game loop; all mutation happens on that task.
pub struct Lobby {
    id: String,
    players: HashMap<SessionId, PlayerBody>,
    ball: BallState,
    court: Court,
    scoring: ScoringEvaluator,
    scoreboard: Scoreboard,
    physics: PhysicsConfig,
    last_tick: Instant,
    tick_count: u64,
    /// When the last player left; `None` while occupied
    emptied_at: Option<Instant>,
    events: broadcast::Sender<LobbyBroadcast>,
}

impl Lobby {
    pub fn new(
        id: String,
        physics: PhysicsConfig,
        score_reset_delay: f64,
        broadcast_capacity: usize,
        now: Instant,
    ) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity);
        Self {
            id,
            players: HashMap::new(),
            ball: BallState::at_spawn(&physics.ball),
            court: Court::standard(),
            scoring: ScoringEvaluator::new(score_reset_delay),
            scoreboard: Scoreboard::default(),
            physics,
            last_tick: now,
            tick_count: 0,
            emptied_at: Some(now),
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn emptied_at(&self) -> Option<Instant> {
        self.emptied_at
    }

    pub fn player(&self, id: SessionId) -> Option<&PlayerBody> {
        self.players.get(&id)
    }

    pub fn ball(&self) -> &BallState {
        &self.ball
    }

    pub fn ball_mut(&mut self) -> &mut BallState {
        &mut self.ball
    }

    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id.clone(),
            count: self.players.len(),
        }
    }

    /// Add a body for `session`, announce it to the lobby, and return the
    /// joiner's init payload plus its event subscription. The subscription
    /// starts after the announcement, so joiners never see themselves join.
    pub fn join(&mut self, session: SessionId) -> (InitMsg, broadcast::Receiver<LobbyBroadcast>) {
        let body = PlayerBody::new(session, self.physics.player);
        let joined = body.joined_msg();
        let start_position = body.position;
        self.players.insert(session, body);
        self.emptied_at = None;

        self.publish(LobbyBroadcast::PlayerJoined(joined));
        let events = self.events.subscribe();

        let init = InitMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            self_id: session,
            lobby_id: self.id.clone(),
            start_position,
            players: self.player_wires(),
            ball_state: self.ball.to_wire(),
            score: self.scoreboard.to_wire(),
            config: self.physics,
        };
        (init, events)
    }

    /// Remove `session`'s body. A ball held by the leaver goes back to the
    /// spawn pose and the reset is announced straight away. Returns false if
    /// the session was not in this lobby.
    pub fn leave(&mut self, session: SessionId, now: Instant) -> bool {
        if self.players.remove(&session).is_none() {
            return false;
        }

        if self.ball.owner == Some(session) {
            self.ball.reset(&self.physics.ball);
            self.publish(LobbyBroadcast::BallUpdated(BallUpdatedMsg {
                ball_state: self.ball.to_wire(),
            }));
        }
        self.publish(LobbyBroadcast::PlayerLeft(PlayerLeftMsg { id: session }));

        if self.players.is_empty() {
            self.emptied_at = Some(now);
        }
        true
    }

    pub fn apply_input(&mut self, session: SessionId, input: &InputMsg) -> bool {
        match self.players.get_mut(&session) {
            Some(body) => {
                body.set_inputs(input);
                true
            }
            None => false,
        }
    }

    pub fn apply_ball_update(
        &mut self,
        session: SessionId,
        update: &BallUpdateMsg,
    ) -> Result<(), BallRejected> {
        self.require_member(session)?;
        self.ball.apply_update(session, update)?;
        Ok(())
    }

    pub fn claim_ball(&mut self, session: SessionId) -> Result<(), BallRejected> {
        self.require_member(session)?;
        self.ball.claim(session)?;
        self.announce_ball();
        Ok(())
    }

    pub fn release_ball(
        &mut self,
        session: SessionId,
        release: &ReleaseBallMsg,
    ) -> Result<(), BallRejected> {
        self.require_member(session)?;
        self.ball
            .release(session, release.position, release.velocity)?;
        self.announce_ball();
        Ok(())
    }

    /// Offer this lobby a scheduler tick at `now`.
    pub fn tick(&mut self, now: Instant, max_delta: f64) -> TickOutcome {
        let delta = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        if delta > max_delta {
            return TickOutcome::Skipped { delta };
        }
        if self.players.is_empty() {
            return TickOutcome::Idle;
        }

        self.step(delta);
        TickOutcome::Advanced { delta }
    }

    /// Advance the simulation by exactly `delta` seconds and send a snapshot.
    pub fn step(&mut self, delta: f64) {
        let collidables = self.court.collidables();
        for body in self.players.values_mut() {
            body.integrate(delta, collidables);
        }

        self.ball.integrate(delta, &self.physics.ball);

        if let Some(team) = self.scoring.evaluate(
            &mut self.ball,
            self.court.triggers(),
            &self.physics.ball,
            delta,
        ) {
            let scored = self.scoreboard.award(team);
            tracing::info!(
                "Lobby {} score for {:?}: {}-{}",
                self.id,
                team,
                scored.home,
                scored.away
            );
            self.publish(LobbyBroadcast::Scored(scored));
        }

        self.tick_count += 1;
        let snapshot = self.snapshot();
        self.publish(LobbyBroadcast::WorldState(snapshot));
    }

    pub fn snapshot(&self) -> WorldStateMsg {
        WorldStateMsg {
            tick: self.tick_count,
            players: self.player_wires(),
            ball_state: self.ball.to_wire(),
            score: self.scoreboard.to_wire(),
        }
    }

    fn player_wires(&self) -> BTreeMap<SessionId, hoops_shared::protocol::PlayerWire> {
        self.players
            .iter()
            .map(|(id, body)| (*id, body.to_wire()))
            .collect()
    }

    fn require_member(&self, session: SessionId) -> Result<(), BallRejected> {
        if self.players.contains_key(&session) {
            Ok(())
        } else {
            Err(BallRejected::NotInLobby)
        }
    }

    fn announce_ball(&self) {
        self.publish(LobbyBroadcast::BallUpdated(BallUpdatedMsg {
            ball_state: self.ball.to_wire(),
        }));
    }

    fn publish(&self, event: LobbyBroadcast) {
        // No subscribers is fine: nobody is listening yet
        let _ = self.events.send(event);
    }
}
