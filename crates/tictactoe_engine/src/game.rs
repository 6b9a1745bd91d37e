//! Game lifecycle: creation, move validation and termination.
//!
//! A [`Game`] is either in progress or finished. Moves are checked in a
//! fixed order before anything is mutated, so a rejected move leaves the
//! game exactly as it was. A move that ends the game returns a
//! [`Termination`] describing the counter and score updates the caller must
//! persist together with the game.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::GameError;
use crate::rules::find_winner;
use crate::standings::{PlayerStats, ScoreResult};
use crate::types::{Board, Mark, UserId};

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The given user completed a line.
    WonBy(UserId),
    /// The board filled with no line completed.
    Tied,
}

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Moves are accepted.
    InProgress,
    /// Terminal; no further moves.
    Finished(Outcome),
}

/// One entry in a game's move history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntry {
    /// A mark placed on a cell.
    Placed {
        /// Mark placed.
        mark: Mark,
        /// Board index.
        cell: usize,
    },
    /// Appended after the winning move.
    Won {
        /// Mark that completed the line.
        mark: Mark,
    },
}

/// Updates owed once a game finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    /// Seat X of the finished game.
    pub player_x: UserId,
    /// Seat O of the finished game.
    pub player_o: UserId,
    /// Result tag for the score record.
    pub result: ScoreResult,
}

impl Termination {
    /// Winning user, if the game was decisive.
    pub fn winner(&self) -> Option<UserId> {
        match self.result {
            ScoreResult::PlayerXWon => Some(self.player_x),
            ScoreResult::PlayerOWon => Some(self.player_o),
            ScoreResult::Tie => None,
        }
    }

    /// Losing user, if the game was decisive.
    pub fn loser(&self) -> Option<UserId> {
        match self.result {
            ScoreResult::PlayerXWon => Some(self.player_o),
            ScoreResult::PlayerOWon => Some(self.player_x),
            ScoreResult::Tie => None,
        }
    }

    /// Counters for `(player_x, player_o)` after this game.
    pub fn settle(&self, x: PlayerStats, o: PlayerStats) -> (PlayerStats, PlayerStats) {
        self.result.settle(x, o)
    }
}

/// What the caller must do after a successful move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEffect {
    /// Game continues; remind the next mover.
    Remind {
        /// User whose turn it now is.
        recipient: UserId,
    },
    /// Game ended; persist the termination with the game.
    Finished(Termination),
}

/// A game between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    player_x: UserId,
    player_o: UserId,
    has_to_move: UserId,
    history: Vec<HistoryEntry>,
    status: GameStatus,
}

impl Game {
    /// Starts a game on an empty `dimension` x `dimension` board with X to move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SamePlayer`] if both seats are the same user and
    /// [`GameError::InvalidDimension`] for an unusable dimension.
    #[instrument]
    pub fn new(player_x: UserId, player_o: UserId, dimension: usize) -> Result<Self, GameError> {
        if player_x == player_o {
            warn!(user = player_x, "Rejecting game against self");
            return Err(GameError::SamePlayer { user: player_x });
        }
        let board = Board::new(dimension)?;
        info!(player_x, player_o, dimension, "Game created");
        Ok(Self {
            board,
            player_x,
            player_o,
            has_to_move: player_x,
            history: Vec::new(),
            status: GameStatus::InProgress,
        })
    }

    /// Rebuilds a game from stored parts.
    pub fn restore(
        board: Board,
        player_x: UserId,
        player_o: UserId,
        has_to_move: UserId,
        history: Vec<HistoryEntry>,
        status: GameStatus,
    ) -> Self {
        Self {
            board,
            player_x,
            player_o,
            has_to_move,
            history,
            status,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Board side length.
    pub fn dimension(&self) -> usize {
        self.board.dimension()
    }

    /// User holding seat X.
    pub fn player_x(&self) -> UserId {
        self.player_x
    }

    /// User holding seat O.
    pub fn player_o(&self) -> UserId {
        self.player_o
    }

    /// User whose turn it is. Meaningless once the game is over.
    pub fn has_to_move(&self) -> UserId {
        self.has_to_move
    }

    /// Moves applied so far, plus the win marker if any.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Lifecycle state.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// True once the game reached a terminal state.
    pub fn is_over(&self) -> bool {
        matches!(self.status, GameStatus::Finished(_))
    }

    /// Winner of a decisive game.
    pub fn winner(&self) -> Option<UserId> {
        match self.status {
            GameStatus::Finished(Outcome::WonBy(user)) => Some(user),
            _ => None,
        }
    }

    /// Loser of a decisive game.
    pub fn loser(&self) -> Option<UserId> {
        self.winner().map(|winner| self.opponent_of(winner))
    }

    /// True if the game finished without a winner.
    pub fn is_tie(&self) -> bool {
        self.status == GameStatus::Finished(Outcome::Tied)
    }

    /// True if `user` holds either seat.
    pub fn involves(&self, user: UserId) -> bool {
        user == self.player_x || user == self.player_o
    }

    /// Mark used by `user`, or `None` if they are not seated.
    pub fn mark_of(&self, user: UserId) -> Option<Mark> {
        if user == self.player_x {
            Some(Mark::X)
        } else if user == self.player_o {
            Some(Mark::O)
        } else {
            None
        }
    }

    fn opponent_of(&self, user: UserId) -> UserId {
        if user == self.player_x {
            self.player_o
        } else {
            self.player_x
        }
    }

    /// Checks that the game may still be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameAlreadyOver`] for a finished game.
    pub fn ensure_cancellable(&self) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        Ok(())
    }

    /// Places `mover`'s mark at `cell` and evaluates the result.
    ///
    /// Checks run in order: game over, turn, index range, occupancy. After
    /// placing the mark the turn passes to the other seat; then a completed
    /// line finishes the game as won by `mover`, and a full board finishes it
    /// as a tie.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameAlreadyOver`], [`GameError::NotYourTurn`],
    /// [`GameError::InvalidMove`] or [`GameError::CellOccupied`]. The game is
    /// unchanged on error.
    #[instrument(skip(self), fields(player_x = self.player_x, player_o = self.player_o))]
    pub fn apply_move(&mut self, mover: UserId, cell: usize) -> Result<MoveEffect, GameError> {
        if self.is_over() {
            warn!("Move on finished game");
            return Err(GameError::GameAlreadyOver);
        }
        if mover != self.has_to_move {
            warn!(expected = self.has_to_move, "Move out of turn");
            return Err(GameError::NotYourTurn { mover });
        }
        let cells = self.board.cell_count();
        if cell >= cells {
            warn!(cells, "Move outside board");
            return Err(GameError::InvalidMove { index: cell, cells });
        }
        if self.board.is_occupied(cell) {
            warn!("Move on occupied cell");
            return Err(GameError::CellOccupied { index: cell });
        }

        let mark = self
            .mark_of(mover)
            .ok_or(GameError::NotYourTurn { mover })?;
        self.board.place(cell, mark)?;
        self.history.push(HistoryEntry::Placed { mark, cell });
        self.has_to_move = self.opponent_of(mover);
        debug!(%mark, cell, next = self.has_to_move, "Mark placed");

        if let Some(winning_mark) = find_winner(&self.board) {
            self.history.push(HistoryEntry::Won { mark: winning_mark });
            self.status = GameStatus::Finished(Outcome::WonBy(mover));
            info!(winner = mover, board = %self.board.display(), "Game won");
            return Ok(MoveEffect::Finished(self.termination(ScoreResult::won_by(mark))));
        }

        if self.board.is_full() {
            self.status = GameStatus::Finished(Outcome::Tied);
            info!(board = %self.board.display(), "Game tied");
            return Ok(MoveEffect::Finished(self.termination(ScoreResult::Tie)));
        }

        Ok(MoveEffect::Remind {
            recipient: self.has_to_move,
        })
    }

    fn termination(&self, result: ScoreResult) -> Termination {
        Termination {
            player_x: self.player_x,
            player_o: self.player_o,
            result,
        }
    }
}
