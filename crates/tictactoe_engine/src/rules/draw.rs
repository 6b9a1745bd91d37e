//! Full-board detection.

use crate::Board;
use tracing::instrument;

/// Checks if the board is full (all squares occupied).
///
/// A full board with no winner is a tie.
#[instrument(skip(board), fields(dimension = board.dimension()))]
pub fn is_full(board: &Board) -> bool {
    board.is_full()
}
