// ABOUTME: Entry point for the fragments binary.
// ABOUTME: Loads .env, parses CLI flags, initializes tracing, selects the storage backend once, and serves HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fragments_core::Converter;
use fragments_server::{AppState, ServerConfig, create_router};
use fragments_store::{BackendConfig, open_backend};

#[derive(Debug, Parser)]
#[command(name = "fragments")]
#[command(
    about = "Owner-scoped content fragment store with on-read format conversion",
    long_about = None
)]
struct Cli {
    /// Socket address to bind (overrides FRAGMENTS_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Storage backend: memory or durable (overrides FRAGMENTS_BACKEND)
    #[arg(long)]
    backend: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("fragments=debug,tower_http=debug")
            }),
        )
        .init();

    let mut server = ServerConfig::from_env().context("invalid server configuration")?;
    if let Some(bind) = cli.bind {
        server.bind = bind;
        if std::env::var("FRAGMENTS_API_URL").is_err() {
            server.api_url = format!("http://{}", bind);
        }
    }

    let backend_config = BackendConfig::from_lookup(|key| match (key, &cli.backend) {
        ("FRAGMENTS_BACKEND", Some(choice)) => Some(choice.clone()),
        _ => std::env::var(key).ok(),
    })
    .context("invalid storage configuration")?;

    tracing::info!(
        bind = %server.bind,
        backend = backend_config.kind(),
        workers = server.conversion_workers,
        "fragments starting up"
    );

    let backend = open_backend(&backend_config).context("failed to open storage backend")?;
    let state = Arc::new(AppState::new(
        backend,
        Converter::new(server.conversion_workers),
        server.api_url.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(server.bind)
        .await
        .with_context(|| format!("failed to bind {}", server.bind))?;
    tracing::info!(url = %server.api_url, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("fragments shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
