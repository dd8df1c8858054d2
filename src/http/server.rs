//! HTTP API Server
//!
//! Axum-based HTTP server for the relay API.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::AppState;
use super::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    listen_addr: String,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(listen_addr: impl Into<String>, state: AppState) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            state,
        }
    }

    /// Run the HTTP server until `shutdown` fires
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .context("Invalid HTTP listen address")?;

        let app = create_router(self.state.clone()).layer(TraceLayer::new_for_http());

        // Bind to address
        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!("HTTP server listening on http://{}", addr);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
