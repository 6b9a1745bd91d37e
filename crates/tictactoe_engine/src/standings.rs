//! Per-user counters, ranking points and finished-game result tags.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::instrument;

use crate::types::Mark;

/// Ranking points for a win.
pub const POINTS_PER_WIN: i32 = 3;
/// Ranking points for a tie.
pub const POINTS_PER_TIE: i32 = 1;

/// Outcome tag stored with every score record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoreResult {
    /// Seat X won.
    PlayerXWon,
    /// Seat O won.
    PlayerOWon,
    /// Board filled with no winner.
    Tie,
}

impl ScoreResult {
    /// Result for a game won by the seat holding `mark`.
    pub fn won_by(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::PlayerXWon,
            Mark::O => Self::PlayerOWon,
        }
    }

    /// Applies this result to both seats' counters, returning `(x, o)`.
    #[instrument(skip(x, o))]
    pub fn settle(self, x: PlayerStats, o: PlayerStats) -> (PlayerStats, PlayerStats) {
        match self {
            Self::PlayerXWon => (x.with_win(), o.with_loss()),
            Self::PlayerOWon => (x.with_loss(), o.with_win()),
            Self::Tie => (x.with_tie(), o.with_tie()),
        }
    }
}

/// Aggregate counters for one user.
///
/// Updates return a new value; nothing here touches storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Decisive games won.
    pub wins: i32,
    /// Tied games.
    pub ties: i32,
    /// Decisive games lost.
    pub losses: i32,
    /// Finished games of any outcome.
    pub matches_played: i32,
}

impl PlayerStats {
    /// Creates counters from stored values.
    pub fn new(wins: i32, ties: i32, losses: i32, matches_played: i32) -> Self {
        Self {
            wins,
            ties,
            losses,
            matches_played,
        }
    }

    /// Ranking points: three per win, one per tie.
    pub fn score(&self) -> i32 {
        self.wins * POINTS_PER_WIN + self.ties * POINTS_PER_TIE
    }

    /// Counters after one more win.
    pub fn with_win(self) -> Self {
        Self {
            wins: self.wins + 1,
            matches_played: self.matches_played + 1,
            ..self
        }
    }

    /// Counters after one more loss.
    pub fn with_loss(self) -> Self {
        Self {
            losses: self.losses + 1,
            matches_played: self.matches_played + 1,
            ..self
        }
    }

    /// Counters after one more tie.
    pub fn with_tie(self) -> Self {
        Self {
            ties: self.ties + 1,
            matches_played: self.matches_played + 1,
            ..self
        }
    }
}

/// Orders `items` by descending score.
///
/// The sort is stable: entries with equal scores keep their input order.
pub fn rank_by_score<T, F>(mut items: Vec<T>, stats: F) -> Vec<T>
where
    F: Fn(&T) -> PlayerStats,
{
    items.sort_by_key(|item| Reverse(stats(item).score()));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_score_formula() {
        assert_eq!(PlayerStats::new(2, 1, 0, 3).score(), 7);
        assert_eq!(PlayerStats::new(1, 0, 4, 5).score(), 3);
        assert_eq!(PlayerStats::new(0, 3, 0, 3).score(), 3);
    }

    #[test]
    fn test_win_and_loss_bump_matches_played() {
        let stats = PlayerStats::default().with_win().with_loss();
        assert_eq!(stats, PlayerStats::new(1, 0, 1, 2));
    }

    #[test]
    fn test_settle_tie() {
        let (x, o) = ScoreResult::Tie.settle(PlayerStats::default(), PlayerStats::new(1, 0, 0, 1));
        assert_eq!(x, PlayerStats::new(0, 1, 0, 1));
        assert_eq!(o, PlayerStats::new(1, 1, 0, 2));
    }

    #[test]
    fn test_settle_o_won() {
        let (x, o) = ScoreResult::PlayerOWon.settle(PlayerStats::default(), PlayerStats::default());
        assert_eq!(x.losses, 1);
        assert_eq!(o.wins, 1);
        assert_eq!(x.matches_played, 1);
        assert_eq!(o.matches_played, 1);
    }

    #[test]
    fn test_ranking_is_stable_on_equal_scores() {
        let users = vec![
            ("user1", PlayerStats::new(2, 1, 0, 3)),
            ("user2", PlayerStats::new(1, 0, 0, 1)),
            ("user3", PlayerStats::new(0, 3, 0, 3)),
        ];
        let ranked = rank_by_score(users, |(_, stats)| *stats);
        let names: Vec<_> = ranked.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["user1", "user2", "user3"]);
    }

    #[test]
    fn test_result_strings() {
        assert_eq!(ScoreResult::PlayerXWon.to_string(), "player_x_won");
        assert_eq!(ScoreResult::PlayerOWon.as_ref(), "player_o_won");
        assert_eq!(ScoreResult::from_str("tie").unwrap(), ScoreResult::Tie);
        assert!(ScoreResult::from_str("draw").is_err());
        assert_eq!(ScoreResult::won_by(Mark::O), ScoreResult::PlayerOWon);
    }
}
