//! mfl-loader - media file loader
//!
//! `load` runs one batch from a folder and prints a JSON summary.
//! `serve` exposes the loader over HTTP with an SSE event stream.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mfl_common::config::{ConfigResolver, LoaderConfig};
use mfl_common::events::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mfl_loader::models::LoadParameters;
use mfl_loader::services::{FileScanner, OverrideStore};
use mfl_loader::{AppState, Collaborators, Loader, NullObserver};

#[derive(Parser, Debug)]
#[command(version, about = "Media file loader with sidecar matching")]
struct Cli {
    /// Config file (overrides MFL_CONFIG and the platform default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a folder once and print the result as JSON
    Load {
        /// Folder to scan
        folder: PathBuf,

        /// Bounded-concurrency batch mode instead of progressive delivery
        #[arg(long)]
        standard: bool,

        /// Concurrency ceiling for batch mode
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Fuzzy match threshold (0.0-1.0)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Run the HTTP service
    Serve {
        /// Address to listen on (defaults to bind_address from config)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = ConfigResolver::new(cli.config.clone());
    let config_path = resolver.locate();
    let config = resolver.resolve().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => info!("Configuration: built-in defaults"),
    }

    let collaborators = build_collaborators(&config)?;

    match cli.command {
        Command::Load {
            folder,
            standard,
            max_concurrent,
            threshold,
        } => {
            let mut params = LoadParameters::from(&config);
            if standard {
                params.progressive_mode = false;
            }
            if let Some(max_concurrent) = max_concurrent {
                params.max_concurrent = max_concurrent;
            }
            if let Some(threshold) = threshold {
                params.fuzzy_match_threshold = threshold;
            }
            params.validate()?;

            run_load(folder, params, collaborators).await
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind_address.clone());
            run_server(&config, &bind, collaborators).await
        }
    }
}

fn build_collaborators(config: &LoaderConfig) -> Result<Collaborators> {
    let collaborators = Collaborators::lofty();

    match &config.overrides_file {
        Some(path) => {
            let store = OverrideStore::load(path)
                .with_context(|| format!("Failed to load overrides from {}", path.display()))?;
            Ok(collaborators.with_custom_metadata(Arc::new(store)))
        }
        None => Ok(collaborators),
    }
}

async fn run_load(
    folder: PathBuf,
    params: LoadParameters,
    collaborators: Collaborators,
) -> Result<()> {
    let files = FileScanner::new()
        .scan(&folder)
        .with_context(|| format!("Failed to scan {}", folder.display()))?;
    info!("Found {} files in {}", files.len(), folder.display());

    let loader = Loader::new(params, collaborators, Arc::new(NullObserver));
    let outcome = loader.load(files).await?;

    let summary = serde_json::json!({
        "session_id": outcome.session.session_id,
        "state": outcome.session.state,
        "duration_ms": outcome.session.duration_ms(),
        "entries": outcome.summaries(),
        "errors": outcome.session.errors,
        "warnings": outcome.session.warnings,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn run_server(config: &LoaderConfig, bind: &str, collaborators: Collaborators) -> Result<()> {
    info!("Starting mfl-loader service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let event_bus = EventBus::new(config.event_capacity);
    let loader = Loader::new(
        LoadParameters::from(config),
        collaborators,
        Arc::new(event_bus.clone()),
    );
    let state = AppState::new(Arc::new(loader), event_bus);
    let app = mfl_loader::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
