//! Serializable views returned to callers.
//!
//! Views name users rather than exposing storage ids.

use serde::{Deserialize, Serialize};
use tictactoe_engine::{HistoryEntry, Square};

use crate::db::{DbError, Score, User};

/// Public view of a user and their standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// Unique name.
    pub name: String,
    /// Contact address, if given.
    pub email: Option<String>,
    /// Decisive games won.
    pub wins: i32,
    /// Tied games.
    pub ties: i32,
    /// Decisive games lost.
    pub losses: i32,
    /// Finished games.
    pub matches_played: i32,
    /// Ranking points.
    pub score: i32,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            name: user.name().clone(),
            email: user.email().clone(),
            wins: *user.wins(),
            ties: *user.ties(),
            losses: *user.losses(),
            matches_played: *user.matches_played(),
            score: user.score(),
        }
    }
}

/// Public view of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    /// Key used to address the game.
    pub key: String,
    /// Cells row-major: `"X"`, `"O"` or `""`.
    pub board: Vec<String>,
    /// Board side length.
    pub dimension: usize,
    /// Name of the X seat.
    pub player_x: String,
    /// Name of the O seat.
    pub player_o: String,
    /// Name of the user to move; absent once the game is over.
    pub has_to_move: Option<String>,
    /// Whether the game finished.
    pub game_over: bool,
    /// Winner's name for a decisive game.
    pub winner: Option<String>,
    /// Loser's name for a decisive game.
    pub loser: Option<String>,
    /// Whether the game finished tied.
    pub tie: bool,
}

/// Renders board squares the way clients display them.
pub fn board_cells(squares: &[Square]) -> Vec<String> {
    squares
        .iter()
        .map(|square| match square {
            Square::Empty => String::new(),
            Square::Occupied(mark) => mark.to_string(),
        })
        .collect()
}

/// One history entry: a placed mark, or the win marker after the last move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    /// `"X"` or `"O"`.
    pub mark: String,
    /// Cell index for placed marks.
    pub cell: Option<usize>,
    /// `"won"` on the synthetic final entry.
    pub outcome: Option<String>,
}

impl From<&HistoryEntry> for HistoryView {
    fn from(entry: &HistoryEntry) -> Self {
        match entry {
            HistoryEntry::Placed { mark, cell } => Self {
                mark: mark.to_string(),
                cell: Some(*cell),
                outcome: None,
            },
            HistoryEntry::Won { mark } => Self {
                mark: mark.to_string(),
                cell: None,
                outcome: Some("won".to_string()),
            },
        }
    }
}

/// Public view of a score record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreView {
    /// Day the game finished, `YYYY-MM-DD`.
    pub date: String,
    /// Name of the X seat.
    pub player_x: String,
    /// Name of the O seat.
    pub player_o: String,
    /// `player_x_won`, `player_o_won` or `tie`.
    pub result: String,
}

impl ScoreView {
    /// Builds a view from a score row and resolved seat names.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored result tag is not a known outcome.
    pub fn new(score: &Score, player_x: String, player_o: String) -> Result<Self, DbError> {
        Ok(Self {
            date: score.played_on().format("%Y-%m-%d").to_string(),
            player_x,
            player_o,
            result: score.parse_result()?.to_string(),
        })
    }
}
