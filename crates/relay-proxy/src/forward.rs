//! Request forwarding to the local backend

use crate::handler::RequestContext;
use crate::{ProxyError, Result};

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// HTTP client forwarding requests to the generation backend
pub struct BackendClient {
    client: Client<hyper_util::client::legacy::connect::HttpConnector, http_body_util::Full<Bytes>>,
    /// Backend endpoint, scheme, host and port
    endpoint: String,
    timeout: Duration,
}

/// Backend response with metadata
#[derive(Debug)]
pub struct BackendResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: Bytes,

    /// Response time in milliseconds
    pub response_time_ms: u64,
}

impl BackendClient {
    /// Create a client for the given backend endpoint
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();

        Self {
            client,
            endpoint: endpoint.into(),
            timeout: request_timeout,
        }
    }

    /// Backend endpoint this client forwards to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Forward a request body to the backend path.
    ///
    /// Backend status codes are propagated in the response rather than
    /// treated as errors; only transport failures and timeouts error out.
    pub async fn forward(
        &self,
        context: &RequestContext,
        path: &str,
        body: Bytes,
    ) -> Result<BackendResponse> {
        let start_time = std::time::Instant::now();

        debug!(
            "Forwarding request {} to {}{}",
            context.request_id, self.endpoint, path
        );

        let uri = format!("{}{}", self.endpoint, path)
            .parse::<Uri>()
            .map_err(|e| ProxyError::Proxy(format!("Invalid backend URI: {}", e)))?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-request-id", &context.request_id)
            .body(http_body_util::Full::new(body))
            .map_err(|e| ProxyError::Proxy(format!("Failed to build request: {}", e)))?;

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ProxyError::Timeout)?
            .map_err(|e| ProxyError::Proxy(format!("Backend request failed: {}", e)))?;

        let response_time_ms = start_time.elapsed().as_millis() as u64;
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string(), value_str.to_string());
            }
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ProxyError::Proxy(format!("Failed to read backend response: {}", e)))?
            .to_bytes();

        info!(
            "Request {} answered by backend in {}ms (status: {})",
            context.request_id, response_time_ms, status
        );

        Ok(BackendResponse {
            status,
            headers,
            body,
            response_time_ms,
        })
    }
}
