//! # taxi-api entry point
//!
//! Parses the command line, sets up tracing, and runs the chosen
//! subcommand.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use taxi_api::bootstrap::{ensure_superuser, Outcome};
use taxi_api::cli::{Cli, Commands, CreateSuperuserArgs, LogFormat, ServeArgs};
use taxi_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::CreateSuperuser(args) => create_superuser(args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.config();
    tracing::info!(?config, "starting taxi-api");

    let pool = taxi_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("failed to initialize database")?;
    let port = config.port;
    let state = AppState::with_config(config, pool);
    state
        .hydrate_from_db()
        .await
        .context("failed to load records from database")?;

    if let Some(credentials) = args.superuser() {
        ensure_superuser(&state, &credentials)
            .await
            .context("failed to create startup superuser")?;
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, "listening");

    axum::serve(listener, taxi_api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn create_superuser(args: CreateSuperuserArgs) -> anyhow::Result<()> {
    let config = AppConfig {
        database_url: Some(args.database_url.clone()),
        ..AppConfig::default()
    };
    let pool = taxi_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("failed to initialize database")?;
    let state = AppState::with_config(config, pool);
    state
        .hydrate_from_db()
        .await
        .context("failed to load records from database")?;

    let (driver, outcome) = ensure_superuser(&state, &args.credentials()).await?;
    match outcome {
        Outcome::Created => println!("Superuser \"{}\" created (id {}).", driver.username, driver.id),
        Outcome::AlreadyExists => println!(
            "A driver named \"{}\" already exists (id {}); nothing changed.",
            driver.username, driver.id
        ),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
