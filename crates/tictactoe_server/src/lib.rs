//! Tic-tac-toe league server.
//!
//! Wraps the rules in [`tictactoe_engine`] with everything a running league
//! needs.
//!
//! # Architecture
//!
//! - **db**: SQLite persistence through diesel, with optimistic versioning on games
//! - **service**: [`LeagueService`], the stateless operation layer
//! - **notify**: reminder queue, background worker and digests
//! - **http**: axum REST routes
//! - **config**: TOML settings with environment overrides
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_server::{
//!     ChannelReminderQueue, LeagueService, ServerConfig, SqliteRepository, run_migrations,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! run_migrations(config.db_path())?;
//! let store = SqliteRepository::new(config.db_path().clone())?;
//! let (queue, _receiver) = ChannelReminderQueue::channel();
//! let service = LeagueService::new(store, queue, config.policy());
//!
//! service.create_user("alice".to_string(), None)?;
//! service.create_user("bob".to_string(), None)?;
//! let game = service.new_game("alice", "bob", None)?;
//! service.apply_move(&game.key, "alice", 4)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod db;
mod error;
mod http;
mod notify;
mod service;
mod views;

// Crate-level exports - Configuration
pub use config::{ConfigError, ENV_DB_PATH, ENV_HOST, ENV_PORT, ServerConfig};

// Crate-level exports - Persistence
pub use db::{
    DbError, DbErrorKind, FinishedGame, GameRepository, LeagueStore, NewScore, Score,
    SqliteRepository, StoredGame, User, UserRepository, run_migrations,
};

// Crate-level exports - Errors
pub use error::{ErrorKind, ServiceError, ServiceResult};

// Crate-level exports - HTTP
pub use http::{CreateUserRequest, ErrorBody, MakeMoveRequest, NewGameRequest, router};

// Crate-level exports - Notifications
pub use notify::{
    ChannelReminderQueue, Digest, LogNotifier, Notifier, QueueError, Reminder, ReminderQueue,
    spawn_reminder_worker,
};

// Crate-level exports - Service
pub use service::LeagueService;

// Crate-level exports - Views
pub use views::{GameView, HistoryView, ScoreView, UserView};
