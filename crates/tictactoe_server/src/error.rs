//! Errors reported to callers of the league service.

use derive_more::{Display, Error};
use tictactoe_engine::GameError;
use tracing::error;

use crate::db::{DbError, DbErrorKind};

/// Caller-visible error category. Each kind has a stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Request body missing or not the expected JSON.
    InvalidRequest,
    /// Board dimension rejected.
    InvalidDimension,
    /// User name empty or malformed.
    InvalidName,
    /// Game key could not be parsed.
    InvalidKey,
    /// Both seats given to one user.
    SamePlayer,
    /// Move index outside the board.
    InvalidMove,
    /// No user with that name.
    UserNotFound,
    /// No game with that key.
    GameNotFound,
    /// Game already finished.
    GameAlreadyOver,
    /// Mover is not the player to move.
    NotYourTurn,
    /// Target cell already marked.
    CellOccupied,
    /// User name already registered.
    DuplicateUser,
    /// Game changed between read and write.
    ConcurrentModification,
    /// Active game cap reached.
    TooManyActiveGames,
    /// Persistence failed.
    Storage,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// True for "does not exist" kinds.
    pub fn is_not_found(self) -> bool {
        matches!(self, Self::UserNotFound | Self::GameNotFound)
    }

    /// True for malformed-request kinds.
    pub fn is_invalid_request(self) -> bool {
        matches!(
            self,
            Self::InvalidRequest
                | Self::InvalidDimension
                | Self::InvalidName
                | Self::InvalidKey
                | Self::SamePlayer
                | Self::InvalidMove
        )
    }
}

/// Error returned by every service operation.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {}", kind, message)]
pub struct ServiceError {
    /// Category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ServiceError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// No user named `name`.
    pub fn user_not_found(name: &str) -> Self {
        Self::new(ErrorKind::UserNotFound, format!("A user named '{}' does not exist", name))
    }

    /// No game with `key`.
    pub fn game_not_found(key: &str) -> Self {
        Self::new(ErrorKind::GameNotFound, format!("Game '{}' not found", key))
    }
}

impl From<GameError> for ServiceError {
    fn from(err: GameError) -> Self {
        let kind = match err {
            GameError::InvalidDimension { .. } => ErrorKind::InvalidDimension,
            GameError::IndexOutOfRange { .. } | GameError::InvalidMove { .. } => {
                ErrorKind::InvalidMove
            }
            GameError::CellOccupied { .. } => ErrorKind::CellOccupied,
            GameError::GameAlreadyOver => ErrorKind::GameAlreadyOver,
            GameError::NotYourTurn { .. } => ErrorKind::NotYourTurn,
            GameError::SamePlayer { .. } => ErrorKind::SamePlayer,
            GameError::TooManyActiveGames { .. } => ErrorKind::TooManyActiveGames,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err.kind {
            DbErrorKind::Conflict => Self::new(ErrorKind::ConcurrentModification, err.message),
            DbErrorKind::UniqueViolation => Self::new(ErrorKind::DuplicateUser, err.message),
            DbErrorKind::NotFound => Self::new(ErrorKind::GameNotFound, err.message),
            DbErrorKind::LimitReached => Self::new(ErrorKind::TooManyActiveGames, err.message),
            DbErrorKind::Other => {
                error!(error = %err, "Storage failure");
                Self::new(ErrorKind::Storage, err.to_string())
            }
        }
    }
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
