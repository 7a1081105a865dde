//! HTTP server exposing the configured routes

use crate::forward::BackendClient;
use crate::handler::{dispatch, RequestContext, RouteState};
use crate::stats::WorkerStats;
use crate::{ProxyError, Result};

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router as AxumRouter};
use relay_core::WorkerConfig;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Generation requests can run for minutes on a loaded GPU; the forward
/// timeout only guards against a wedged backend.
const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(600);

/// The proxy worker server
pub struct WorkerServer {
    config: WorkerConfig,
    state: AppState,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    routes: Arc<HashMap<String, Arc<RouteState>>>,
    client: Arc<BackendClient>,
    stats: Arc<WorkerStats>,
}

impl WorkerServer {
    /// Create a server from a validated configuration
    pub fn new(config: WorkerConfig) -> Result<Self> {
        Self::with_backend_timeout(config, DEFAULT_BACKEND_TIMEOUT)
    }

    /// Create a server with an explicit backend request timeout
    pub fn with_backend_timeout(config: WorkerConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;

        let client = Arc::new(BackendClient::new(config.backend_endpoint(), timeout));

        let mut routes = HashMap::new();
        for route in &config.routes {
            routes.insert(route.path.clone(), Arc::new(RouteState::new(route.clone())));
        }

        let state = AppState {
            routes: Arc::new(routes),
            client,
            stats: Arc::new(WorkerStats::new()),
        };

        Ok(Self { config, state })
    }

    /// Get the worker configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Get the worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        self.state.stats.clone()
    }

    /// Build the Axum router with all routes
    pub fn router(&self) -> AxumRouter {
        let mut router = AxumRouter::new()
            .route("/health", get(health_check))
            .route("/stats", get(stats_handler));

        for path in self.state.routes.keys() {
            router = router.route(path, post(proxy_handler));
        }

        router
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until a shutdown signal is received
    pub async fn serve(&self, bind_addr: &str) -> Result<()> {
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| ProxyError::Configuration(format!("Invalid bind address: {}", e)))?;

        info!(
            "Starting proxy worker on {} for backend {}",
            addr,
            self.config.backend_endpoint()
        );

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ProxyError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        if let Err(e) = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Worker server error: {}", e);
            return Err(ProxyError::Server(format!("Worker server failed: {}", e)));
        }

        info!("Worker server shut down");
        Ok(())
    }
}

/// Wait for SIGTERM or Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

/// Liveness endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.stats.uptime_seconds(),
    }))
}

/// Worker statistics endpoint
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

/// Proxy a request on a configured route
async fn proxy_handler(
    State(state): State<AppState>,
    matched: MatchedPath,
    body: bytes::Bytes,
) -> axum::response::Response {
    let context = RequestContext::new();

    let Some(route) = state.routes.get(matched.as_str()) else {
        // Routes are registered from the same map; a miss here means the
        // router and the route table diverged.
        error!("No route state for matched path {}", matched.as_str());
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "unknown route", &context);
    };

    match dispatch(route, &state.client, &state.stats, &context, body).await {
        Ok(backend) => {
            let status =
                StatusCode::from_u16(backend.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut builder = Response::builder()
                .status(status)
                .header("x-request-id", &context.request_id);

            if let Some(content_type) = backend.headers.get("content-type") {
                builder = builder.header("content-type", content_type.as_str());
            }

            match builder.body(Body::from(backend.body)) {
                Ok(response) => response,
                Err(e) => {
                    error!("Failed to build response for {}: {}", context.request_id, e);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "response build failed", &context)
                }
            }
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.to_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            warn!(
                "Request {} on {} failed with {}: {}",
                context.request_id,
                matched.as_str(),
                status,
                e
            );
            error_response(status, &e.to_string(), &context)
        }
    }
}

fn error_response(status: StatusCode, message: &str, context: &RequestContext) -> axum::response::Response {
    (
        status,
        [("x-request-id", context.request_id.as_str())],
        Json(json!({
            "error": message,
            "request_id": context.request_id,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use bytes::Bytes;
    use relay_core::{RouteConfig, WorkloadCost};
    use tower::ServiceExt;

    async fn spawn_backend(app: AxumRouter) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn echo_backend() -> SocketAddr {
        spawn_backend(
            AxumRouter::new().route("/generate", post(|body: Bytes| async move { body })),
        )
        .await
    }

    fn worker_for(addr: SocketAddr, route: RouteConfig) -> WorkerServer {
        let config = WorkerConfig::builder()
            .backend("http://127.0.0.1", addr.port())
            .route(route)
            .build();
        WorkerServer::new(config).unwrap()
    }

    fn generate_route() -> RouteConfig {
        RouteConfig::new("/generate")
            .serial()
            .max_queue_time(Duration::from_secs(2))
            .workload(WorkloadCost::Constant(100.0))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let addr = echo_backend().await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let addr = echo_backend().await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["requests_total"], 0);
        assert_eq!(json["workload_total"], 0.0);
    }

    #[tokio::test]
    async fn test_generate_forwarded_to_backend() {
        let addr = echo_backend().await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"steps\":8,\"seed\":42}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = body_json(response).await;
        assert_eq!(json["steps"], 8);
        assert_eq!(json["seed"], 42);

        let snapshot = server.stats().snapshot();
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.completed_total, 1);
        assert_eq!(snapshot.workload_total, 100.0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let addr = echo_backend().await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/other")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let addr = echo_backend().await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_serial_route_rejects_queued_request_with_429() {
        // Backend slow enough that the second request exceeds its queue wait
        let backend = AxumRouter::new().route(
            "/generate",
            post(|body: Bytes| async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                body
            }),
        );
        let addr = spawn_backend(backend).await;

        let route = RouteConfig::new("/generate")
            .serial()
            .max_queue_time(Duration::from_millis(50))
            .workload(WorkloadCost::Constant(100.0));
        let server = worker_for(addr, route);

        let router = server.router();
        let first = {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .oneshot(
                        Request::builder()
                            .method("POST")
                            .uri("/generate")
                            .body(Body::from("{}"))
                            .unwrap(),
                    )
                    .await
                    .unwrap()
            })
        };

        // Let the first request occupy the serial slot
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let first = first.await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let snapshot = server.stats().snapshot();
        assert_eq!(snapshot.rejected_total, 1);
        assert_eq!(snapshot.completed_total, 1);
    }

    #[tokio::test]
    async fn test_backend_status_propagated() {
        let backend = AxumRouter::new().route(
            "/generate",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "loading") }),
        );
        let addr = spawn_backend(backend).await;
        let server = worker_for(addr, generate_route());

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = WorkerConfig::default(); // no routes
        assert!(WorkerServer::new(config).is_err());
    }
}
