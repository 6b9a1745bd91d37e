//! Core domain types: marks, squares and the NxN board.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::GameError;

/// Identifier of a registered user, as assigned by storage.
pub type UserId = i32;

/// Mark placed by one of the two seats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum Mark {
    /// Seat X (moves first).
    #[display("X")]
    X,
    /// Seat O.
    #[display("O")]
    O,
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// No mark yet.
    Empty,
    /// Holds a seat's mark.
    Occupied(Mark),
}

/// Square NxN board stored row-major.
///
/// The number of squares is always `dimension * dimension`; boards read back
/// from storage are checked against that on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    dimension: usize,
    squares: Vec<Square>,
}

#[derive(Deserialize)]
struct RawBoard {
    dimension: usize,
    squares: Vec<Square>,
}

impl TryFrom<RawBoard> for Board {
    type Error = GameError;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        let mut board = Board::new(raw.dimension)?;
        if raw.squares.len() != board.squares.len() {
            return Err(GameError::InvalidDimension {
                dimension: raw.dimension,
                max: Board::MAX_DIMENSION,
            });
        }
        board.squares = raw.squares;
        Ok(board)
    }
}

impl Board {
    /// Largest dimension any board may have.
    pub const MAX_DIMENSION: usize = 64;

    /// Creates an empty `dimension` x `dimension` board.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidDimension`] if `dimension` is zero or
    /// larger than [`Board::MAX_DIMENSION`].
    #[instrument]
    pub fn new(dimension: usize) -> Result<Self, GameError> {
        if dimension == 0 || dimension > Self::MAX_DIMENSION {
            return Err(GameError::InvalidDimension {
                dimension,
                max: Self::MAX_DIMENSION,
            });
        }
        Ok(Self {
            dimension,
            squares: vec![Square::Empty; dimension * dimension],
        })
    }

    /// Side length of the board.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of cells (`dimension` squared).
    pub fn cell_count(&self) -> usize {
        self.squares.len()
    }

    /// Gets the square at `index`, or `None` when off the board.
    pub fn get(&self, index: usize) -> Option<Square> {
        self.squares.get(index).copied()
    }

    /// Returns true if `index` is on the board and holds a mark.
    pub fn is_occupied(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Square::Occupied(_)))
    }

    /// Places `mark` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IndexOutOfRange`] for an index off the board and
    /// [`GameError::CellOccupied`] if the cell already holds a mark. The board
    /// is unchanged on error.
    #[instrument(skip(self), fields(dimension = self.dimension))]
    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), GameError> {
        let cells = self.squares.len();
        let square = self
            .squares
            .get_mut(index)
            .ok_or(GameError::IndexOutOfRange { index, cells })?;
        if *square != Square::Empty {
            return Err(GameError::CellOccupied { index });
        }
        *square = Square::Occupied(mark);
        Ok(())
    }

    /// Returns true when no square is empty.
    pub fn is_full(&self) -> bool {
        self.squares.iter().all(|s| *s != Square::Empty)
    }

    /// All squares in row-major order.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    /// Formats the board as rows of `X`, `O` and `.` separated by `|`.
    pub fn display(&self) -> String {
        self.squares
            .chunks(self.dimension)
            .map(|row| {
                row.iter()
                    .map(|square| match square {
                        Square::Empty => ".".to_string(),
                        Square::Occupied(mark) => mark.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(3).unwrap();
        assert_eq!(board.cell_count(), 9);
        assert!(board.squares().iter().all(|s| *s == Square::Empty));
        assert!(!board.is_full());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            Board::new(0),
            Err(GameError::InvalidDimension { dimension: 0, .. })
        ));
    }

    #[test]
    fn test_oversized_dimension_rejected() {
        assert!(Board::new(Board::MAX_DIMENSION + 1).is_err());
    }

    #[test]
    fn test_place_out_of_range() {
        let mut board = Board::new(3).unwrap();
        assert_eq!(
            board.place(9, Mark::X),
            Err(GameError::IndexOutOfRange { index: 9, cells: 9 })
        );
    }

    #[test]
    fn test_place_occupied_leaves_board_unchanged() {
        let mut board = Board::new(3).unwrap();
        board.place(4, Mark::X).unwrap();
        let before = board.clone();
        assert_eq!(
            board.place(4, Mark::O),
            Err(GameError::CellOccupied { index: 4 })
        );
        assert_eq!(board, before);
        assert!(board.is_occupied(4));
    }

    #[test]
    fn test_single_cell_board_fills() {
        let mut board = Board::new(1).unwrap();
        board.place(0, Mark::O).unwrap();
        assert!(board.is_full());
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(2).unwrap();
        board.place(0, Mark::X).unwrap();
        board.place(3, Mark::O).unwrap();
        assert_eq!(board.display(), "X|.\n.|O");
    }

    #[test]
    fn test_deserialize_rejects_wrong_length() {
        let json = r#"{"dimension":3,"squares":["Empty"]}"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }

    #[test]
    fn test_serde_keeps_marks() {
        let mut board = Board::new(3).unwrap();
        board.place(2, Mark::O).unwrap();
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
