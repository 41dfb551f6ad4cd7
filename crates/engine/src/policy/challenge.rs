//! Daily challenge completion window

use chrono::{DateTime, Utc};
use rewards_core::{ChallengeType, Failure, TodayChallenge};
use std::time::Duration;

pub const NOT_STARTED_MESSAGE: &str = "Start today's challenge before completing it.";

/// A game challenge must be played for `window` before it can be completed.
/// Spin challenges complete as soon as the spin is redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCompletionPolicy {
    window: Duration,
}

impl ChallengeCompletionPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn check(&self, challenge: &TodayChallenge, now: DateTime<Utc>) -> Result<(), Failure> {
        if challenge.challenge_type == ChallengeType::Spin {
            return Ok(());
        }

        let Some(started_at) = challenge.started_at else {
            return Err(Failure::precondition(NOT_STARTED_MESSAGE));
        };

        let elapsed = (now - started_at).to_std().unwrap_or(Duration::ZERO);
        if elapsed >= self.window {
            return Ok(());
        }

        let remaining = self.window - elapsed;
        let minutes = remaining.as_secs().div_ceil(60).max(1);
        Err(Failure::precondition(format!(
            "Keep playing! {} more minute{} to complete today's challenge.",
            minutes,
            if minutes == 1 { "" } else { "s" }
        )))
    }
}

impl Default for ChallengeCompletionPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn challenge(kind: ChallengeType, started_mins_ago: Option<i64>, now: DateTime<Utc>) -> TodayChallenge {
        TodayChallenge {
            conversion_id: "conv_1".to_string(),
            challenge_type: kind,
            started_at: started_mins_ago.map(|m| now - ChronoDuration::minutes(m)),
        }
    }

    #[test]
    fn test_game_needs_ten_minutes() {
        let now = Utc::now();
        let policy = ChallengeCompletionPolicy::default();

        let early = policy
            .check(&challenge(ChallengeType::Game, Some(3), now), now)
            .unwrap_err();
        assert_eq!(
            early.user_message,
            "Keep playing! 7 more minutes to complete today's challenge."
        );
        assert!(policy.check(&challenge(ChallengeType::Game, Some(10), now), now).is_ok());
    }

    #[test]
    fn test_spin_waives_window() {
        let now = Utc::now();
        let policy = ChallengeCompletionPolicy::default();
        assert!(policy.check(&challenge(ChallengeType::Spin, None, now), now).is_ok());
    }

    #[test]
    fn test_unstarted_game_refused() {
        let now = Utc::now();
        let failure = ChallengeCompletionPolicy::default()
            .check(&challenge(ChallengeType::Game, None, now), now)
            .unwrap_err();
        assert_eq!(failure.user_message, NOT_STARTED_MESSAGE);
    }
}
