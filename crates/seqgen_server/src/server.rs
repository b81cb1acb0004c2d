//! HTTP server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{self, AppState};
use axum::routing::any;
use axum::Router;
use seqgen_core::SequenceEngine;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Creates the API router.
///
/// | Path              | Methods  | Response                       |
/// |-------------------|----------|--------------------------------|
/// | `/ping/`          | any      | `pong`                         |
/// | `/stat/`          | any      | request statistics             |
/// | `/sequence/<key>` | GET, PUT | next value / registered value  |
///
/// Anything else is a 404 with a JSON error body.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping/", any(handler::ping))
        .route("/stat/", any(handler::stat))
        .route("/sequence/:key", any(handler::sequence))
        .fallback(handler::fallback)
        .with_state(state)
}

/// The sequence HTTP server.
///
/// # Example
///
/// ```rust,no_run
/// use seqgen_core::{Config, SequenceEngine};
/// use seqgen_server::{SequenceServer, ServerConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Arc::new(SequenceEngine::start(Config::new("/var/sequence-generator/", "/tmp"))?);
/// let server = SequenceServer::new(ServerConfig::default(), engine);
/// server.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SequenceServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl SequenceServer {
    /// Creates a server around a started engine.
    pub fn new(config: ServerConfig, engine: Arc<SequenceEngine>) -> Self {
        let state = Arc::new(AppState::new(engine, config.request_timeout));
        Self { config, state }
    }

    /// Returns the handler state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Returns the router serving this server's state.
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the accept loop
    /// fails.
    pub async fn run<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run_on(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    pub async fn run_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "ListenAndServe");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("http server stopped");
        Ok(())
    }
}
