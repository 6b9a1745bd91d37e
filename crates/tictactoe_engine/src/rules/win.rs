//! Win detection for any board dimension.

use crate::{Board, Mark, Square};
use tracing::{debug, instrument};

/// A line of `dimension` cells that wins when uniformly marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Row `r`: cells `r*N .. r*N + N`.
    Row(usize),
    /// Column `c`: cells `c, c + N, c + 2N, ...`.
    Column(usize),
    /// Top-left to bottom-right: stride `N + 1` from 0.
    Diagonal,
    /// Top-right to bottom-left: stride `N - 1` from `N - 1`.
    AntiDiagonal,
}

impl Line {
    /// Board indices covered by this line on an NxN board.
    pub fn indices(self, dimension: usize) -> impl Iterator<Item = usize> {
        let n = dimension;
        (0..n).map(move |i| match self {
            Line::Row(r) => r * n + i,
            Line::Column(c) => c + i * n,
            Line::Diagonal => i * (n + 1),
            Line::AntiDiagonal => (n - 1) * (i + 1),
        })
    }
}

/// All winning lines in scan order: rows, columns, main diagonal, anti-diagonal.
pub fn lines(dimension: usize) -> impl Iterator<Item = Line> {
    (0..dimension)
        .map(Line::Row)
        .chain((0..dimension).map(Line::Column))
        .chain([Line::Diagonal, Line::AntiDiagonal])
}

/// Returns the mark owning a complete line, if any.
///
/// Lines are scanned rows first, then columns, then the main diagonal and
/// finally the anti-diagonal; the first uniform line decides the result.
/// Fullness of the board plays no part.
#[instrument(skip(board), fields(dimension = board.dimension()))]
pub fn find_winner(board: &Board) -> Option<Mark> {
    let n = board.dimension();
    for line in lines(n) {
        if let Some(mark) = line_owner(board, line) {
            debug!(?line, %mark, "Winning line found");
            return Some(mark);
        }
    }
    None
}

fn line_owner(board: &Board, line: Line) -> Option<Mark> {
    let mut cells = line.indices(board.dimension()).map(|i| board.get(i));
    let first = match cells.next()? {
        Some(Square::Occupied(mark)) => mark,
        _ => return None,
    };
    cells
        .all(|square| square == Some(Square::Occupied(first)))
        .then_some(first)
}
