//! HTTP listener setup
//!
//! [`ServerConfig`] carries the listen address, runtime size, upload cap
//! and detector options; [`WebServer`] turns it into an axum router with
//! CORS and body-size layers applied.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use super::routes::{service_routes, AppState};
use super::{DEFAULT_BIND, DEFAULT_PORT, DEFAULT_UPLOAD_LIMIT};
use crate::detector::DetectorOptions;

/// Listener and request-handling settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Interface address, e.g. `127.0.0.1` or `0.0.0.0`
    pub bind: String,
    /// Worker threads for the async runtime
    pub workers: usize,
    /// Request body cap in bytes; larger uploads get 413
    pub upload_limit: usize,
    /// Options for `/analyze`
    pub detector: DetectorOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            workers: num_cpus::get(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            detector: DetectorOptions::default(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    #[must_use]
    pub fn with_upload_limit(mut self, limit: usize) -> Self {
        self.upload_limit = limit;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: DetectorOptions) -> Self {
        self.detector = detector;
        self
    }

    /// `bind:port` as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

/// HTTP service bound to one [`AppState`]
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(config.detector.clone()));
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared state, e.g. for reading usage counters
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Router with all routes and layers applied
    pub fn router(&self) -> Router {
        Router::new()
            .merge(service_routes())
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.upload_limit))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.socket_addr()?;
        let router = self.router();

        println!("Listening on http://{addr}");
        println!("Endpoints:");
        println!("  POST /analyze           - Detect watermark candidates");
        println!("  POST /preview           - Cleaned first page as PNG");
        println!("  POST /process           - Download cleaned PDF");
        println!("  POST /analytics/track   - Record a usage event");
        println!("  GET  /analytics/stats   - Usage counters");
        println!("  GET  /analytics/export  - Recorded events");
        println!("  GET  /health            - Health check");
        tracing::info!(%addr, upload_limit = self.config.upload_limit, "Server listening");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new()
    }
}
