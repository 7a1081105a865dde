//! # relay-core
//!
//! Configuration model and shared types for the relay proxy worker.
//!
//! This crate provides:
//! - The worker configuration (`WorkerConfig`) wiring a backend address, a
//!   log file, routes and log-pattern trigger sets together
//! - Per-route queueing policy and workload-cost estimation
//! - Log-pattern sets used to infer backend state from a log stream
//! - The generation request payload and its benchmark variant
//!
//! ## Example
//!
//! ```rust
//! use relay_core::{WorkerConfig, RouteConfig, WorkloadCost};
//! use std::time::Duration;
//!
//! let config = WorkerConfig::builder()
//!     .backend("http://127.0.0.1", 18288)
//!     .route(RouteConfig::new("/generate")
//!         .serial()
//!         .max_queue_time(Duration::from_secs(120))
//!         .workload(WorkloadCost::Constant(100.0)))
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod logpattern;
pub mod payload;
pub mod workload;

// Re-export commonly used types
pub use config::{BenchmarkConfig, PayloadGenerator, RouteConfig, WorkerConfig, WorkerConfigBuilder};
pub use error::{Error, Result};
pub use logpattern::{LogActionConfig, LogEvent};
pub use payload::GenerationPayload;
pub use workload::WorkloadCost;
