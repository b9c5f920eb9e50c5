//! Agora server entry point.
//!
//! Binary name: `agorad`
//!
//! Parses CLI arguments, initializes the database and services, starts the
//! autonomous chat scheduler, and serves the HTTP/WebSocket API until
//! ctrl-c.

mod http;
mod state;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "agorad", about = "Agora community chat server", version)]
struct Cli {
    /// Address to bind, e.g. 127.0.0.1:8000
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Data directory (database, config.toml). Defaults to AGORA_DATA_DIR
    /// or ~/.agora
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Persona profile directory. Defaults to {data_dir}/personas
    #[arg(long)]
    personas_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,agora=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let app_state = AppState::init(cli.data_dir, cli.personas_dir).await?;
    tracing::info!(
        data_dir = %app_state.data_dir.display(),
        personas = app_state.personas.len(),
        "state initialized"
    );

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!("Agora listening on http://{}", cli.bind);

    app_state.scheduler.start().await;

    let scheduler = app_state.scheduler.clone();
    let router = http::router::build_router(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the in-flight scheduler tick finish before exiting.
    scheduler.stop().await;
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
    }
}
