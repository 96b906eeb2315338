//! HTTP API server for the vector database.

pub mod routes;

use crate::config::Config;
use crate::engine::Engine;
use std::sync::Arc;
use tracing::info;

/// Shared application state for the HTTP server.
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Dimension every upserted vector must have.
    pub dim: usize,
    /// Default result count for searches.
    pub top_k: usize,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, config: &Config) -> Self {
        Self {
            engine,
            dim: config.dim,
            top_k: config.top_k,
        }
    }
}

/// Serve the API on `addr` until the process is stopped.
pub async fn start(addr: &str, engine: Arc<Engine>, config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(engine, config));

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
