//! Database persistence layer for users, games and scores.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, instrument};

pub use error::{DbError, DbErrorKind};
pub use models::{
    FinishedGame, GameRecord, GameRow, NewScore, NewUser, Score, StoredGame, User,
};
pub use repository::{GameRepository, LeagueStore, SqliteRepository, UserRepository};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies any pending schema migrations to the database at `db_path`.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or a migration fails.
#[instrument]
pub fn run_migrations(db_path: &str) -> Result<(), DbError> {
    let mut conn = SqliteConnection::establish(db_path)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::other(format!("Migration failed: {}", e)))?;
    info!(count = applied.len(), "Migrations applied");
    Ok(())
}
