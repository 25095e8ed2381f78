//! agc-an - App Guidelines Checker analyzer
//!
//! **Module Identity:**
//! - Name: agc-an (Analyzer)
//! - Port: 5780
//!
//! Serves the idea submission form and `POST /api/analyze`, or runs a single
//! analysis from the command line with `agc-an check`.

use agc_common::config::{resolve_api_key, TomlConfig, API_KEY_ENV_VAR};
use agc_common::report::render_text;
use agc_common::AppIdea;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agc_an::services::Analyzer;
use agc_an::{build_router, AppState};

/// Command-line arguments for agc-an
#[derive(Parser, Debug)]
#[command(name = "agc-an")]
#[command(about = "App Store Review Guidelines compliance analyzer")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Interface to bind to (overrides config file)
    #[arg(long, env = "AGC_HOST", global = true)]
    host: Option<String>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "AGC_PORT", global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Analyze one app idea and print the report
    Check {
        /// Read the idea from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load before tracing init so the configured level applies; logged below
    let (config, config_source) = TomlConfig::load(args.config.as_deref())?;

    init_tracing(&config.logging.level);

    info!(
        "Starting agc-an (Analyzer) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    config.validate()?;

    match args.command {
        Some(Command::Check { file, json }) => run_check(&config, file, json).await,
        Some(Command::Serve) | None => run_server(config, args.host, args.port).await,
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the config file.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_server(config: TomlConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let api_key = resolve_api_key(&config);
    let state = AppState::from_config(&config, api_key)
        .context("Failed to initialize LLM client")?;

    match &state.analyzer {
        Some(analyzer) => info!("Model: {}", analyzer.model()),
        None => warn!("Analysis disabled until {} is configured", API_KEY_ENV_VAR),
    }

    let app = build_router(state);

    let host = host.unwrap_or(config.host);
    let port = port.unwrap_or(config.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn run_check(config: &TomlConfig, file: Option<PathBuf>, json: bool) -> Result<()> {
    let raw = match &file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read app idea from stdin")?;
            buf
        }
    };

    let idea = AppIdea::parse(&raw, &config.analysis.idea_limits())?;

    let api_key = resolve_api_key(config)
        .ok_or_else(|| anyhow!("No API key configured. Set {}", API_KEY_ENV_VAR))?;
    let analyzer = Analyzer::from_config(config, api_key)?;

    let report = analyzer.analyze(&idea).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
