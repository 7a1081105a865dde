//! Request handling: admission, cost estimation and dispatch

use crate::forward::{BackendClient, BackendResponse};
use crate::gate::RouteGate;
use crate::stats::WorkerStats;
use crate::Result;

use bytes::Bytes;
use relay_core::RouteConfig;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Request context for tracking and tracing
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID
    pub request_id: String,

    /// Receive timestamp
    pub received_at: Instant,
}

impl RequestContext {
    /// Create a new request context
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            received_at: Instant::now(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-route runtime state: the route descriptor and its admission gate
pub struct RouteState {
    /// Route configuration
    pub config: RouteConfig,

    /// Admission gate
    pub gate: RouteGate,
}

impl RouteState {
    /// Build runtime state for a route
    pub fn new(config: RouteConfig) -> Self {
        let gate = RouteGate::new(&config);
        Self { config, gate }
    }
}

/// Run one request through the route: estimate workload, wait for admission,
/// forward to the backend.
///
/// The admission permit is held until the backend answers, so a serial route
/// processes one request end to end before the next is admitted.
pub async fn dispatch(
    route: &RouteState,
    client: &BackendClient,
    stats: &WorkerStats,
    context: &RequestContext,
    body: Bytes,
) -> Result<BackendResponse> {
    stats.record_received();

    let payload: serde_json::Value = serde_json::from_slice(&body)?;
    let cost = route.config.workload.estimate(&payload);

    debug!(
        "Request {} on {} estimated at workload {}",
        context.request_id, route.config.path, cost
    );

    let _permit = match route.gate.admit().await {
        Ok(permit) => permit,
        Err(e) => {
            stats.record_rejected();
            return Err(e);
        }
    };

    stats.record_admitted(cost);

    match client.forward(context, &route.config.path, body).await {
        Ok(response) => {
            stats.record_completed();
            Ok(response)
        }
        Err(e) => {
            stats.record_backend_error();
            Err(e)
        }
    }
}
