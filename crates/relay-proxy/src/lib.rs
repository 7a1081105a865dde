//! # relay-proxy
//!
//! The proxy worker runtime parameterized by a `relay_core::WorkerConfig`.
//!
//! This crate provides:
//! - HTTP ingress exposing the configured routes plus `/health` and `/stats`
//! - Per-route admission gating (serial vs parallel, bounded queue wait)
//! - Request forwarding to the local generation backend
//! - Worker statistics
//!
//! ## Example
//!
//! ```rust,no_run
//! use relay_core::{RouteConfig, WorkerConfig};
//! use relay_proxy::WorkerServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkerConfig::builder()
//!         .backend("http://127.0.0.1", 18288)
//!         .route(RouteConfig::new("/generate").serial())
//!         .build();
//!
//!     let server = WorkerServer::new(config)?;
//!     server.serve("0.0.0.0:8080").await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod forward;
pub mod gate;
pub mod handler;
pub mod server;
pub mod stats;

// Re-export main types
pub use forward::{BackendClient, BackendResponse};
pub use gate::RouteGate;
pub use handler::RequestContext;
pub use server::WorkerServer;
pub use stats::{StatsSnapshot, WorkerStats};

/// Result type for worker runtime operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur in the worker runtime
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Request timed out waiting in queue")]
    QueueTimeout,

    #[error("Backend request timed out")]
    Timeout,

    #[error("Core error: {0}")]
    Core(#[from] relay_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Convert to HTTP status code
    pub fn to_status_code(&self) -> u16 {
        match self {
            ProxyError::Configuration(_) => 500,
            ProxyError::Server(_) => 500,
            ProxyError::Proxy(_) => 502,
            ProxyError::QueueTimeout => 429,
            ProxyError::Timeout => 504,
            ProxyError::Core(e) if e.is_client_error() => 400,
            ProxyError::Core(_) => 500,
            ProxyError::Json(_) => 400,
            ProxyError::Io(_) => 500,
        }
    }
}

/// Initialize logging and tracing for the worker process
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
