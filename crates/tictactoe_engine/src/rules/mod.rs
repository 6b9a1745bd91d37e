//! Game rules for NxN tic-tac-toe.
//!
//! Pure functions over a [`Board`](crate::Board). They hold no game state
//! and can be reused outside any particular game.

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::{Line, find_winner, lines};
