//! Rules engine for NxN tic-tac-toe leagues.
//!
//! This crate is pure game logic with no I/O:
//!
//! - **Board**: fixed NxN grid of squares, row-major.
//! - **Rules**: win and full-board detection over any dimension.
//! - **Game**: the turn-by-turn state machine between two registered users.
//! - **Standings**: per-user counters, ranking points and score result tags.
//! - **Policy**: configurable limits applied when games are created.
//!
//! Persisting the values produced here is the caller's job. A finished move
//! returns everything that must be written together.
//!
//! # Example
//!
//! ```
//! use tictactoe_engine::{Game, MoveEffect};
//!
//! # fn main() -> Result<(), tictactoe_engine::GameError> {
//! let alice = 1;
//! let bob = 2;
//! let mut game = Game::new(alice, bob, 3)?;
//!
//! let effect = game.apply_move(alice, 4)?;
//! assert_eq!(effect, MoveEffect::Remind { recipient: bob });
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod game;
mod policy;
pub mod rules;
mod standings;
mod types;

pub use error::GameError;
pub use game::{Game, GameStatus, HistoryEntry, MoveEffect, Outcome, Termination};
pub use policy::GamePolicy;
pub use rules::{find_winner, is_full};
pub use standings::{PlayerStats, ScoreResult, rank_by_score};
pub use types::{Board, Mark, Square, UserId};
