//! KolOS server binary
//!
//! Run with: cargo run --bin kolos-server [config.toml]

use std::path::PathBuf;

use kolos::{config::AppConfig, server::KolosServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolos=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("configuration loaded");
    tracing::info!("  - backend: {:?}", config.backend);
    tracing::info!("  - completion model: {}", config.completion.model);
    tracing::info!("  - retrieval top_k: {}", config.vector.top_k);
    tracing::info!(
        "  - chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let server = KolosServer::new(config).await?;

    tracing::info!("API: http://{}/api", server.address());
    tracing::info!("health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
