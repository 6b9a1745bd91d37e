//! Command-line interface for tictactoe_server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tic-tac-toe league server
#[derive(Parser, Debug)]
#[command(name = "tictactoe_server")]
#[command(about = "Tic-tac-toe league server with REST API and player reminders", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server, reminder worker and digest sweep
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (created if it doesn't exist)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate {
        /// Path to the database file
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Send one round of in-progress digests and exit
    Digest {
        /// Path to the database file
        #[arg(long)]
        db_path: Option<String>,
    },
}
