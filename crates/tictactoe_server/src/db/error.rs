//! Database error types.

use derive_more::{Display, Error};
use diesel::result::DatabaseErrorKind;

/// Broad category of a database failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DbErrorKind {
    /// Requested row does not exist.
    NotFound,
    /// A unique constraint rejected the write.
    UniqueViolation,
    /// Row changed since it was read.
    Conflict,
    /// A per-user limit checked inside the write rejected it.
    LimitReached,
    /// Anything else: connection, query or corrupt data.
    Other,
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error ({}): {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// Failure category.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new database error with caller location tracking.
    #[track_caller]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`DbErrorKind::Other`].
    #[track_caller]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Other, message)
    }

    /// Shorthand for [`DbErrorKind::Conflict`].
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Conflict, message)
    }

    /// Shorthand for [`DbErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::NotFound, message)
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::not_found("Record not found"),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::new(DbErrorKind::UniqueViolation, info.message().to_string())
            }
            other => Self::other(format!("Diesel error: {}", other)),
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::other(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("Corrupt stored game: {}", err))
    }
}
