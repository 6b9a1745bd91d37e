//! Tic-tac-toe league server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::time::Duration;
use tictactoe_server::{
    ChannelReminderQueue, LeagueService, LeagueStore, LogNotifier, ReminderQueue, ServerConfig,
    SqliteRepository, router, run_migrations, spawn_reminder_worker,
};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve {
            host,
            port,
            db_path,
        } => serve(config.with_cli_overrides(host, port, db_path)).await,
        Command::Migrate { db_path } => migrate(&config.with_cli_overrides(None, None, db_path)),
        Command::Digest { db_path } => digest(&config.with_cli_overrides(None, None, db_path)),
    }
}

/// Run the HTTP server with the reminder worker and digest sweep.
#[instrument(skip_all, fields(host = %config.host(), port = config.port()))]
async fn serve(config: ServerConfig) -> Result<()> {
    run_migrations(config.db_path())?;
    let store = SqliteRepository::new(config.db_path().clone())?;

    let (queue, receiver) = ChannelReminderQueue::channel();
    let worker = spawn_reminder_worker(receiver, LogNotifier);
    let service = LeagueService::new(store, queue, config.policy());
    let sweep = spawn_digest_sweep(service.clone(), *config.digest_interval_secs());

    let app = router(service);
    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!("Server ready at http://{}:{}/", config.host(), config.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining reminders");
    if let Some(sweep) = sweep {
        sweep.abort();
        let _ = sweep.await;
    }
    worker.await?;
    Ok(())
}

/// Apply migrations and exit.
#[instrument(skip_all, fields(db_path = %config.db_path()))]
fn migrate(config: &ServerConfig) -> Result<()> {
    run_migrations(config.db_path())?;
    info!("Database is up to date");
    Ok(())
}

/// Send one round of digests and exit.
#[instrument(skip_all, fields(db_path = %config.db_path()))]
fn digest(config: &ServerConfig) -> Result<()> {
    let store = SqliteRepository::new(config.db_path().clone())?;
    let (queue, _receiver) = ChannelReminderQueue::channel();
    let service = LeagueService::new(store, queue, config.policy());
    let sent = service.send_digests(&LogNotifier)?;
    info!(sent, "Digests sent");
    Ok(())
}

/// Periodically sends digests. Returns `None` when the interval is 0.
fn spawn_digest_sweep<S: LeagueStore, Q: ReminderQueue>(
    service: LeagueService<S, Q>,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Digest sweep disabled");
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let service = service.clone();
            match tokio::task::spawn_blocking(move || service.send_digests(&LogNotifier)).await {
                Ok(Ok(sent)) => info!(sent, "Digest sweep finished"),
                Ok(Err(e)) => warn!(error = %e, "Digest sweep failed"),
                Err(e) => error!(error = %e, "Digest sweep task panicked"),
            }
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
