//! Limits applied when creating games.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::GameError;
use crate::types::{Board, UserId};

/// Creation-time policy for new games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePolicy {
    /// Dimension used when a request does not name one.
    pub default_dimension: usize,
    /// Largest dimension a request may ask for.
    pub max_dimension: usize,
    /// Cap on games in progress per user; `None` disables the cap.
    pub max_active_games: Option<usize>,
}

impl Default for GamePolicy {
    fn default() -> Self {
        Self {
            default_dimension: 3,
            max_dimension: 16,
            max_active_games: None,
        }
    }
}

impl GamePolicy {
    /// Picks the requested dimension or the default, and checks the range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidDimension`] when the dimension is zero or
    /// above the configured (or board-wide) maximum.
    #[instrument]
    pub fn resolve_dimension(&self, requested: Option<usize>) -> Result<usize, GameError> {
        let dimension = requested.unwrap_or(self.default_dimension);
        let max = self.max_dimension.min(Board::MAX_DIMENSION);
        if dimension == 0 || dimension > max {
            warn!(dimension, max, "Dimension rejected by policy");
            return Err(GameError::InvalidDimension { dimension, max });
        }
        Ok(dimension)
    }

    /// Checks `user`'s number of games in progress against the cap.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TooManyActiveGames`] when the cap is enabled and
    /// already reached.
    #[instrument]
    pub fn check_active_games(&self, user: UserId, active: usize) -> Result<(), GameError> {
        match self.max_active_games {
            Some(limit) if active >= limit => {
                warn!(user, active, limit, "Active game cap reached");
                Err(GameError::TooManyActiveGames { user, limit })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimension_is_three() {
        assert_eq!(GamePolicy::default().resolve_dimension(None), Ok(3));
    }

    #[test]
    fn test_requested_dimension_checked() {
        let policy = GamePolicy::default();
        assert_eq!(policy.resolve_dimension(Some(5)), Ok(5));
        assert_eq!(
            policy.resolve_dimension(Some(0)),
            Err(GameError::InvalidDimension { dimension: 0, max: 16 })
        );
        assert!(policy.resolve_dimension(Some(17)).is_err());
    }

    #[test]
    fn test_cap_disabled_by_default() {
        assert!(GamePolicy::default().check_active_games(1, 1000).is_ok());
    }

    #[test]
    fn test_cap_enforced() {
        let policy = GamePolicy {
            max_active_games: Some(3),
            ..GamePolicy::default()
        };
        assert!(policy.check_active_games(1, 2).is_ok());
        assert_eq!(
            policy.check_active_games(1, 3),
            Err(GameError::TooManyActiveGames { user: 1, limit: 3 })
        );
    }
}
