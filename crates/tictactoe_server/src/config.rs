//! Server configuration: TOML file, environment overrides, defaults.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tictactoe_engine::GamePolicy;
use tracing::{debug, info, instrument, warn};

/// Environment variable overriding [`ServerConfig::db_path`].
pub const ENV_DB_PATH: &str = "TICTACTOE_DB_PATH";
/// Environment variable overriding [`ServerConfig::host`].
pub const ENV_HOST: &str = "TICTACTOE_HOST";
/// Environment variable overriding [`ServerConfig::port`].
pub const ENV_PORT: &str = "TICTACTOE_PORT";

/// Configuration for the league server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Board side used when a new game names none.
    #[serde(default = "default_dimension")]
    default_dimension: usize,

    /// Largest board side accepted.
    #[serde(default = "default_max_dimension")]
    max_dimension: usize,

    /// Per-user cap on games in progress. Absent means no cap.
    #[serde(default)]
    max_active_games: Option<usize>,

    /// Seconds between digest sweeps; 0 disables them.
    #[serde(default = "default_digest_interval_secs")]
    digest_interval_secs: u64,
}

fn default_db_path() -> String {
    "tictactoe.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_dimension() -> usize {
    3
}

fn default_max_dimension() -> usize {
    16
}

fn default_digest_interval_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            default_dimension: default_dimension(),
            max_dimension: default_max_dimension(),
            max_active_games: None,
            digest_interval_secs: default_digest_interval_secs(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(db_path = %config.db_path, "Config loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML, unknown keys or an
    /// inconsistent dimension range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path` when given, otherwise starts from defaults, then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file or an override is invalid.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the port override is not a number.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            debug!(db_path = %db_path, "Database path overridden by environment");
            self.db_path = db_path;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| {
                warn!(port = %port, "Bad port override");
                ConfigError::new(format!("{} is not a valid port: '{}'", ENV_PORT, port))
            })?;
        }
        Ok(self)
    }

    /// Applies command-line overrides, which win over file and environment.
    pub fn with_cli_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        db_path: Option<String>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        self
    }

    /// Game creation rules derived from this config.
    pub fn policy(&self) -> GamePolicy {
        GamePolicy {
            default_dimension: self.default_dimension,
            max_dimension: self.max_dimension,
            max_active_games: self.max_active_games,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_dimension == 0 || self.default_dimension > self.max_dimension {
            return Err(ConfigError::new(format!(
                "default_dimension {} must be between 1 and max_dimension {}",
                self.default_dimension, self.max_dimension
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
