//! Worker configuration
//!
//! A `WorkerConfig` is assembled once at startup and handed to the runtime:
//! it wires the backend address, the backend log file, the exposed routes with
//! their queueing policy and workload-cost function, and the log-pattern
//! trigger sets together. The runtime owns all behavior; the configuration is
//! purely declarative.

use crate::logpattern::LogActionConfig;
use crate::workload::WorkloadCost;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Callback producing a benchmark request payload. Invoked once per benchmark
/// run so randomized fields (the seed) are fresh every time.
pub type PayloadGenerator = Arc<dyn Fn() -> serde_json::Value + Send + Sync>;

/// Complete configuration for a proxy worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Backend base URL (scheme and host, no port)
    pub backend_url: Url,

    /// Backend port
    pub backend_port: u16,

    /// Backend log file monitored for readiness and error patterns
    pub log_file: PathBuf,

    /// Routes exposed to the routing layer
    pub routes: Vec<RouteConfig>,

    /// Log-pattern trigger sets
    pub log_actions: LogActionConfig,
}

/// Route descriptor: a path exposed to the routing layer mapped to backend
/// handling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// URL path, `/`-prefixed
    pub path: String,

    /// Whether the backend accepts overlapping requests on this route
    #[serde(default)]
    pub allow_parallel_requests: bool,

    /// Maximum time a request may wait in queue before rejection with 429
    #[serde(default = "default_max_queue_time")]
    pub max_queue_time: Duration,

    /// Workload-cost function for scheduling estimates
    #[serde(default)]
    pub workload: WorkloadCost,

    /// Benchmark descriptor, if this route is benchmarked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkConfig>,
}

/// Benchmark descriptor for a route
#[derive(Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of benchmark requests per measurement
    #[serde(default = "default_benchmark_count")]
    pub runs: u32,

    /// Concurrent benchmark requests per measurement
    #[serde(default = "default_benchmark_count")]
    pub concurrency: u32,

    /// Payload generator, attached in code rather than from a config file
    #[serde(skip)]
    pub generator: Option<PayloadGenerator>,
}

fn default_max_queue_time() -> Duration {
    Duration::from_secs(60)
}

fn default_benchmark_count() -> u32 {
    1
}

impl WorkerConfig {
    /// Create a builder with default configuration
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::new()
    }

    /// Load configuration from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Write configuration to a YAML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    /// Full backend endpoint, scheme, host and port
    pub fn backend_endpoint(&self) -> String {
        let host = self.backend_url.host_str().unwrap_or("127.0.0.1");
        format!("{}://{}:{}", self.backend_url.scheme(), host, self.backend_port)
    }

    /// Look up a route by path
    pub fn route(&self, path: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.scheme() != "http" && self.backend_url.scheme() != "https" {
            return Err(Error::config("backend URL must use HTTP or HTTPS scheme"));
        }

        if self.backend_port == 0 {
            return Err(Error::config("backend port must be greater than 0"));
        }

        if self.routes.is_empty() {
            return Err(Error::config("at least one route is required"));
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(Error::config(format!(
                    "route path must start with '/': {}",
                    route.path
                )));
            }

            if !seen.insert(route.path.as_str()) {
                return Err(Error::config(format!("duplicate route path: {}", route.path)));
            }

            if route.max_queue_time.is_zero() {
                return Err(Error::config(format!(
                    "max queue time must be greater than 0 for route {}",
                    route.path
                )));
            }

            if let Some(benchmark) = &route.benchmark {
                if benchmark.runs == 0 || benchmark.concurrency == 0 {
                    return Err(Error::config(format!(
                        "benchmark runs and concurrency must be greater than 0 for route {}",
                        route.path
                    )));
                }
            }
        }

        if !self.log_actions.is_disjoint() {
            return Err(Error::config(format!(
                "log-pattern sets overlap: {:?}",
                self.log_actions.overlapping_patterns()
            )));
        }

        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse("http://127.0.0.1").expect("static URL parses"),
            backend_port: 8080,
            log_file: PathBuf::from("/var/log/backend.log"),
            routes: Vec::new(),
            log_actions: LogActionConfig::default(),
        }
    }
}

impl RouteConfig {
    /// Create a route descriptor for a path with default policy
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            allow_parallel_requests: false,
            max_queue_time: default_max_queue_time(),
            workload: WorkloadCost::default(),
            benchmark: None,
        }
    }

    /// Force one request at a time on this route
    pub fn serial(mut self) -> Self {
        self.allow_parallel_requests = false;
        self
    }

    /// Allow overlapping requests on this route
    pub fn parallel(mut self) -> Self {
        self.allow_parallel_requests = true;
        self
    }

    /// Set the maximum queue wait before rejection
    pub fn max_queue_time(mut self, max: Duration) -> Self {
        self.max_queue_time = max;
        self
    }

    /// Set the workload-cost function
    pub fn workload(mut self, workload: WorkloadCost) -> Self {
        self.workload = workload;
        self
    }

    /// Attach a benchmark descriptor
    pub fn benchmark(mut self, benchmark: BenchmarkConfig) -> Self {
        self.benchmark = Some(benchmark);
        self
    }
}

impl BenchmarkConfig {
    /// Create a benchmark descriptor with the given payload generator
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn() -> serde_json::Value + Send + Sync + 'static,
    {
        Self {
            runs: default_benchmark_count(),
            concurrency: default_benchmark_count(),
            generator: Some(Arc::new(generator)),
        }
    }

    /// Set the number of runs per measurement
    pub fn runs(mut self, runs: u32) -> Self {
        self.runs = runs;
        self
    }

    /// Set the concurrency per measurement
    pub fn concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Generate one benchmark payload
    pub fn generate(&self) -> Option<serde_json::Value> {
        self.generator.as_ref().map(|g| g())
    }
}

impl std::fmt::Debug for BenchmarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkConfig")
            .field("runs", &self.runs)
            .field("concurrency", &self.concurrency)
            .field("generator", &self.generator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Builder for `WorkerConfig`
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
        }
    }

    /// Set the backend URL and port
    pub fn backend(mut self, url: &str, port: u16) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            self.config.backend_url = parsed;
        }
        self.config.backend_port = port;
        self
    }

    /// Set the backend log file
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = path.into();
        self
    }

    /// Add a route
    pub fn route(mut self, route: RouteConfig) -> Self {
        self.config.routes.push(route);
        self
    }

    /// Set the log-pattern trigger sets
    pub fn log_actions(mut self, log_actions: LogActionConfig) -> Self {
        self.config.log_actions = log_actions;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

impl Default for WorkerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
