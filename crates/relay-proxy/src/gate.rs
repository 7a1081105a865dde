//! Per-route admission gating
//!
//! Each route carries a gate that enforces the backend's concurrency model: a
//! serial route admits one request at a time, a parallel route admits any
//! number. A request that cannot be admitted within the route's maximum queue
//! wait is rejected so the routing layer can retry elsewhere.

use crate::{ProxyError, Result};

use relay_core::RouteConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;

/// Admission gate for a single route
pub struct RouteGate {
    /// Route path, for logging
    path: String,

    /// Admission semaphore, one permit for serial routes
    semaphore: Arc<Semaphore>,

    /// Maximum time a request may wait for admission
    max_queue_time: Duration,

    /// Whether the route is serial
    serial: bool,
}

impl RouteGate {
    /// Create a gate for a route
    pub fn new(route: &RouteConfig) -> Self {
        let permits = if route.allow_parallel_requests {
            Semaphore::MAX_PERMITS
        } else {
            1
        };

        Self {
            path: route.path.clone(),
            semaphore: Arc::new(Semaphore::new(permits)),
            max_queue_time: route.max_queue_time,
            serial: !route.allow_parallel_requests,
        }
    }

    /// Wait for admission, up to the route's maximum queue time.
    ///
    /// The returned permit holds the admission slot until dropped.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        match timeout(self.max_queue_time, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(ProxyError::Server(format!(
                "admission gate closed for route {}",
                self.path
            ))),
            Err(_) => {
                debug!(
                    "Request on {} waited {:?} without admission, rejecting",
                    self.path, self.max_queue_time
                );
                Err(ProxyError::QueueTimeout)
            }
        }
    }

    /// Whether the route admits one request at a time
    pub fn is_serial(&self) -> bool {
        self.serial
    }

    /// Currently available admission slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Maximum queue wait before rejection
    pub fn max_queue_time(&self) -> Duration {
        self.max_queue_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial_route(max_queue: Duration) -> RouteConfig {
        RouteConfig::new("/generate").serial().max_queue_time(max_queue)
    }

    #[tokio::test]
    async fn test_serial_gate_admits_one() {
        let gate = RouteGate::new(&serial_route(Duration::from_millis(50)));
        assert!(gate.is_serial());
        assert_eq!(gate.available(), 1);

        let permit = gate.admit().await.unwrap();
        assert_eq!(gate.available(), 0);

        // Second admission cannot be granted while the permit is held
        let rejected = gate.admit().await;
        assert!(matches!(rejected, Err(ProxyError::QueueTimeout)));

        drop(permit);
        assert!(gate.admit().await.is_ok());
    }

    #[tokio::test]
    async fn test_parallel_gate_admits_many() {
        let route = RouteConfig::new("/generate")
            .parallel()
            .max_queue_time(Duration::from_millis(50));
        let gate = RouteGate::new(&route);
        assert!(!gate.is_serial());

        let _a = gate.admit().await.unwrap();
        let _b = gate.admit().await.unwrap();
        let _c = gate.admit().await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_request_admitted_when_slot_frees() {
        let gate = Arc::new(RouteGate::new(&serial_route(Duration::from_secs(5))));

        let permit = gate.admit().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.admit().await.is_ok() })
        };

        // Give the waiter time to queue, then free the slot
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(permit);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_max_queue_time_recorded() {
        let gate = RouteGate::new(&serial_route(Duration::from_secs(120)));
        assert_eq!(gate.max_queue_time(), Duration::from_secs(120));
    }
}
