//! Proxy worker daemon for the ComfyUI image-generation backend
//!
//! Thin configuration over the relay runtime: declares the backend address,
//! the `/generate` route with its queueing policy and workload cost, the
//! log-pattern trigger sets for readiness detection, and the benchmark
//! payload. All proxying behavior lives in relay-proxy.

use clap::Parser;
use relay_core::{
    BenchmarkConfig, GenerationPayload, LogActionConfig, RouteConfig, WorkerConfig, WorkloadCost,
};
use relay_proxy::WorkerServer;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

const BACKEND_URL: &str = "http://127.0.0.1";
const BACKEND_PORT: u16 = 18288;
const BACKEND_LOG_FILE: &str = "/var/log/portal/comfyui.log";

// Log patterns for ComfyUI readiness detection
const MODEL_LOAD_LOG_MSGS: &[&str] = &["To see the GUI go to:"];

const MODEL_ERROR_LOG_MSGS: &[&str] = &[
    "RuntimeError:",
    "Traceback (most recent call last):",
    "CUDA out of memory",
    "CUDA error",
];

const MODEL_INFO_LOG_MSGS: &[&str] = &["Downloading", "Loading model"];

/// Generate a benchmark payload: a minimal generation with a fresh seed.
fn benchmark_payload() -> serde_json::Value {
    GenerationPayload::benchmark().to_value()
}

/// Assemble the worker configuration.
fn worker_config() -> WorkerConfig {
    WorkerConfig::builder()
        .backend(BACKEND_URL, BACKEND_PORT)
        .log_file(BACKEND_LOG_FILE)
        .route(
            RouteConfig::new("/generate")
                // ComfyUI processes one workflow at a time
                .serial()
                // Max time a request can wait in queue before 429
                .max_queue_time(Duration::from_secs(120))
                // Constant workload per image generation
                .workload(WorkloadCost::Constant(100.0))
                .benchmark(BenchmarkConfig::new(benchmark_payload).runs(1).concurrency(1)),
        )
        .log_actions(LogActionConfig::new(
            MODEL_LOAD_LOG_MSGS,
            MODEL_ERROR_LOG_MSGS,
            MODEL_INFO_LOG_MSGS,
        ))
        .build()
}

#[derive(Parser)]
#[command(name = "relayd")]
#[command(about = "Proxy worker between the GPU routing layer and ComfyUI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Worker listen address
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Optional YAML configuration overriding the built-in one
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    relay_proxy::init_logging(&cli.log_level);

    let config = match cli.config {
        Some(ref path) => {
            info!("Loading configuration from: {}", path.display());
            match WorkerConfig::load_from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to load configuration: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => worker_config(),
    };

    info!(
        "Proxy worker configured for backend {} with {} route(s)",
        config.backend_endpoint(),
        config.routes.len()
    );

    let server = match WorkerServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Invalid worker configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.serve(&cli.listen).await {
        error!("Worker failed: {}", e);
        std::process::exit(1);
    }
}
