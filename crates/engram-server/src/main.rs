//! Engram Server - Chat Memory for AI Assistants
//!
//! Ingests exported chat transcripts, enriches them with summaries, topics,
//! and embeddings, and serves the corpus over:
//! - a REST API (ingest, chats, search, prompt synthesis, visualisation)
//! - a JSON-RPC tool endpoint for external assistants (/mcp, /sse)
//! - a health endpoint reporting per-dependency readiness

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use engram_core::Settings;
use engram_server::{http, AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "engram-server", version, about = "Chat memory server")]
struct Cli {
    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Metadata store DSN or path (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("Engram server v{} starting...", engram_core::VERSION);

    let mut settings = Settings::from_env();
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let state = AppState::initialize(settings).context("failed to initialize application state")?;

    // Startup probes: report, never refuse to start
    if state.embedder.probe().await {
        info!("Embedding provider '{}' is ready", state.embedder.provider_name());
    } else {
        warn!(
            "Embedding provider '{}' is not reachable; ingestion and search will fail until it is",
            state.embedder.provider_name()
        );
    }
    if state.summarizer.probe().await {
        info!("Chat provider '{}' is ready", state.summarizer.provider_name());
    } else {
        warn!(
            "Chat provider '{}' is not reachable; summaries will fall back",
            state.summarizer.provider_name()
        );
    }
    match state.store.count_conversations() {
        Ok(count) => info!("Metadata store ready with {} conversation(s)", count),
        Err(e) => warn!("Metadata store probe failed: {}", e),
    }
    if state.gate.is_some() {
        info!("Relevance gate enabled");
    }

    let addr: SocketAddr = format!("{}:{}", state.settings.host, state.settings.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let app = http::build_router(state);

    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Engram server shutting down");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
