use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topfive::{
    api,
    config::ServerConfig,
    provider::ProviderConfig,
    state::AppState,
    store::{MemoryLedger, MemoryRoomStore},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topfive=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Top Five...");

    let config = ServerConfig::from_env();
    let provider_config = ProviderConfig::from_env();

    let movies = match provider_config.build_movie_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to initialize the movie provider: {}", e);
            std::process::exit(1);
        }
    };
    let football = match provider_config.build_football_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to initialize the football provider: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let ledger = MemoryLedger::new(config.ledger_ttl);
    let state = Arc::new(AppState::new(
        config,
        Arc::new(MemoryRoomStore::new()),
        Arc::new(ledger),
        Arc::new(movies),
        Arc::new(football),
    ));

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
