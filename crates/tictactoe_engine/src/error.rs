//! Rule violations raised by the engine.

use derive_more::{Display, Error};

use crate::types::UserId;

/// Error raised when a board, game or move violates the rules.
///
/// No variant is produced after a mutation has started: every check runs
/// before the game is touched.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// Board dimension outside the accepted range.
    #[display("Invalid board dimension {dimension} (must be between 1 and {max})")]
    InvalidDimension {
        /// Requested dimension.
        dimension: usize,
        /// Largest accepted dimension.
        max: usize,
    },

    /// Cell index outside the board.
    #[display("Cell {index} is outside a board of {cells} cells")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of cells on the board.
        cells: usize,
    },

    /// Target cell already holds a mark.
    #[display("Cell {index} is already occupied")]
    CellOccupied {
        /// Requested index.
        index: usize,
    },

    /// Game already reached a terminal state.
    #[display("Game is already over")]
    GameAlreadyOver,

    /// Mover is not the player whose turn it is.
    #[display("It is not user {mover}'s turn")]
    NotYourTurn {
        /// User that attempted the move.
        mover: UserId,
    },

    /// Move index is not a cell of this game's board.
    #[display("Move {index} is not valid on a board of {cells} cells")]
    InvalidMove {
        /// Requested index.
        index: usize,
        /// Number of cells on the board.
        cells: usize,
    },

    /// Both seats were given to the same user.
    #[display("User {user} cannot play against themselves")]
    SamePlayer {
        /// The duplicated user.
        user: UserId,
    },

    /// User already has the maximum number of games in progress.
    #[display("User {user} already has {limit} active games")]
    TooManyActiveGames {
        /// User over the cap.
        user: UserId,
        /// Configured cap.
        limit: usize,
    },
}
