use crate::ball::BallState;
use crate::court::ScoreTrigger;
use hoops_shared::config::BallTuning;
use hoops_shared::protocol::{ScoreWire, ScoredMsg, Team};

/// Detects baskets and schedules the ball respawn that follows one.
///
/// A basket is the ball's box touching a trigger while moving downward.
/// After a basket, further detection is suppressed until `reset_delay`
/// seconds of simulated time have passed, at which point the ball returns to
/// its spawn pose. A ball that lingers in the trigger box therefore scores
/// exactly once.
#[derive(Debug, Clone)]
pub struct ScoringEvaluator {
    reset_delay: f64,
    /// Seconds left before the pending respawn, if a basket is being celebrated
    pending: Option<f64>,
}

impl ScoringEvaluator {
    pub fn new(reset_delay: f64) -> Self {
        Self {
            reset_delay,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run one evaluation cycle covering `delta` seconds.
    pub fn evaluate(
        &mut self,
        ball: &mut BallState,
        triggers: &[ScoreTrigger],
        tuning: &BallTuning,
        delta: f64,
    ) -> Option<Team> {
        if let Some(remaining) = self.pending {
            let remaining = remaining - delta;
            if remaining <= 0.0 {
                ball.reset(tuning);
                self.pending = None;
            } else {
                self.pending = Some(remaining);
            }
            return None;
        }

        if ball.velocity.y >= 0.0 {
            return None;
        }

        let bounds = ball.bounds(tuning);
        let trigger = triggers.iter().find(|t| bounds.intersects(&t.bounds))?;
        self.pending = Some(self.reset_delay);
        Some(team_for(trigger))
    }
}

/// The far hoop (negative Z) is attacked by the home side.
pub fn team_for(trigger: &ScoreTrigger) -> Team {
    if trigger.center_z() < 0.0 {
        Team::Home
    } else {
        Team::Away
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub home: u32,
    pub away: u32,
}

impl Scoreboard {
    pub fn award(&mut self, team: Team) -> ScoredMsg {
        match team {
            Team::Home => self.home += 1,
            Team::Away => self.away += 1,
        }
        ScoredMsg {
            team,
            home: self.home,
            away: self.away,
        }
    }

    pub fn to_wire(&self) -> ScoreWire {
        ScoreWire {
            home: self.home,
            away: self.away,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::court::Court;
    use hoops_shared::vec3::{vec3, Vec3};

    const DT: f64 = 1.0 / 60.0;

    fn ball_above(trigger: &ScoreTrigger, height: f64, vy: f64) -> BallState {
        let c = trigger.bounds.center();
        BallState {
            position: vec3(c.x, c.y + height, c.z),
            velocity: vec3(0.0, vy, 0.0),
            owner: None,
        }
    }

    #[test]
    fn downward_pass_scores_exactly_once() {
        let court = Court::standard();
        let tuning = BallTuning::default();
        let far = court.triggers()[0];
        let mut ball = ball_above(&far, 0.6, -1.0);
        let mut evaluator = ScoringEvaluator::new(1.0);

        let mut events = Vec::new();
        // Slow fall keeps the ball inside the trigger box for several cycles
        for _ in 0..40 {
            ball.position.y += ball.velocity.y * DT;
            if let Some(team) = evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT) {
                events.push(team);
            }
        }
        assert_eq!(events, vec![Team::Home]);
        assert!(evaluator.is_pending());
    }

    #[test]
    fn upward_pass_does_not_score() {
        let court = Court::standard();
        let tuning = BallTuning::default();
        let near = court.triggers()[1];
        let mut ball = ball_above(&near, 0.0, 4.0);
        let mut evaluator = ScoringEvaluator::new(1.0);
        assert_eq!(
            evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT),
            None
        );
        assert!(!evaluator.is_pending());
    }

    #[test]
    fn near_hoop_credits_away() {
        let court = Court::standard();
        let tuning = BallTuning::default();
        let near = court.triggers()[1];
        let mut ball = ball_above(&near, 0.0, -2.0);
        let mut evaluator = ScoringEvaluator::new(1.0);
        assert_eq!(
            evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT),
            Some(Team::Away)
        );
    }

    #[test]
    fn ball_respawns_after_delay_and_scoring_rearms() {
        let court = Court::standard();
        let tuning = BallTuning::default();
        let far = court.triggers()[0];
        let mut ball = ball_above(&far, 0.0, -2.0);
        ball.owner = Some(3);
        let mut evaluator = ScoringEvaluator::new(1.0);

        assert!(evaluator
            .evaluate(&mut ball, court.triggers(), &tuning, DT)
            .is_some());

        // Just short of the delay nothing happens to the ball
        for _ in 0..59 {
            assert_eq!(
                evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT),
                None
            );
        }
        assert_ne!(ball.position, tuning.spawn_position);

        // Small slack for float accumulation of 1/60 steps
        evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT + 1e-9);
        assert!(!evaluator.is_pending());
        assert_eq!(ball.position, tuning.spawn_position);
        assert_eq!(ball.velocity, Vec3::ZERO);
        assert_eq!(ball.owner, None);

        // Another downward pass counts again
        let mut again = ball_above(&far, 0.0, -2.0);
        assert_eq!(
            evaluator.evaluate(&mut again, court.triggers(), &tuning, DT),
            Some(Team::Home)
        );
    }

    #[test]
    fn ball_far_from_hoops_never_scores() {
        let court = Court::standard();
        let tuning = BallTuning::default();
        let mut ball = BallState::at_spawn(&tuning);
        ball.velocity.y = -5.0;
        let mut evaluator = ScoringEvaluator::new(1.0);
        assert_eq!(
            evaluator.evaluate(&mut ball, court.triggers(), &tuning, DT),
            None
        );
    }

    #[test]
    fn scoreboard_awards_points() {
        let mut board = Scoreboard::default();
        board.award(Team::Home);
        let msg = board.award(Team::Away);
        let msg2 = board.award(Team::Home);
        assert_eq!(msg.away, 1);
        assert_eq!(msg2.team, Team::Home);
        assert_eq!(board.to_wire(), ScoreWire { home: 2, away: 1 });
    }
}
