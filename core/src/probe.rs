//! RPC endpoint health probe
//!
//! Sends a single `eth_blockNumber` JSON-RPC call and reports whether the
//! endpoint answered with HTTP 200 and how long it took. Every failure is
//! folded into the result so the status indicator always has something to show.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Hard budget for the whole probe request (connect + response)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub const NO_ENDPOINT_DETAIL: &str = "no endpoint configured";
pub const CONNECTION_FAILED_DETAIL: &str = "connection failed";

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub reachable: bool,
    /// Latency such as `842ms`, or the failure reason
    pub detail: String,
    pub latency_ms: Option<u64>,
    pub checked_at: i64,
}

impl ProbeResult {
    fn online(latency_ms: u64) -> Self {
        Self {
            reachable: true,
            detail: format!("{latency_ms}ms"),
            latency_ms: Some(latency_ms),
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    fn offline(detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            detail: detail.into(),
            latency_ms: None,
            checked_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Network layer used by the probe
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// POST `body` as JSON, read the whole response, and return its status code.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<u16, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(status)
    }
}

/// The liveness request body
pub fn block_number_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1,
    })
}

/// Checks a JSON-RPC endpoint, one attempt per call
#[derive(Clone)]
pub struct EndpointProbe {
    transport: Arc<dyn RpcTransport>,
    timeout: Duration,
}

impl EndpointProbe {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_transport(transport: Arc<dyn RpcTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Probe `url`. Empty or missing URLs make no network call.
    pub async fn check(&self, url: Option<&str>) -> ProbeResult {
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return ProbeResult::offline(NO_ENDPOINT_DETAIL),
        };

        let body = block_number_request();
        let start = Instant::now();
        let outcome = self.transport.post_json(url, &body, self.timeout).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(200) => {
                let latency_ms = (elapsed.as_secs_f64() * 1000.0).round() as u64;
                debug!("RPC endpoint healthy ({latency_ms}ms)");
                ProbeResult::online(latency_ms)
            }
            Ok(status) => {
                debug!("RPC endpoint answered HTTP {status}");
                ProbeResult::offline(format!("HTTP {status}"))
            }
            Err(e) => {
                debug!("RPC probe failed: {e}");
                ProbeResult::offline(CONNECTION_FAILED_DETAIL)
            }
        }
    }
}

impl Default for EndpointProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that counts calls and answers with a fixed status
    struct CountingTransport {
        calls: AtomicUsize,
        status: u16,
    }

    #[async_trait]
    impl RpcTransport for CountingTransport {
        async fn post_json(
            &self,
            _url: &str,
            _body: &Value,
            _timeout: Duration,
        ) -> Result<u16, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status)
        }
    }

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn is_latency(detail: &str) -> bool {
        detail
            .strip_suffix("ms")
            .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_empty_url_makes_no_call() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            status: 200,
        });
        let probe = EndpointProbe::with_transport(transport.clone(), DEFAULT_PROBE_TIMEOUT);

        for url in [None, Some(""), Some("   ")] {
            let result = probe.check(url).await;
            assert!(!result.reachable);
            assert_eq!(result.detail, "no endpoint configured");
            assert_eq!(result.latency_ms, None);
            assert!(result.checked_at > 0);
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_call_per_check() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            status: 503,
        });
        let probe = EndpointProbe::with_transport(transport.clone(), DEFAULT_PROBE_TIMEOUT);
        let result = probe.check(Some("http://rpc.invalid")).await;
        assert_eq!(result.detail, "HTTP 503");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_healthy_endpoint_reports_latency() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route(
                "/",
                post(
                    |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                        *seen.lock().unwrap() = Some(body);
                        Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10d4f"}))
                    },
                ),
            )
            .with_state(seen.clone());
        let url = spawn_stub(app).await;

        let before = chrono::Utc::now().timestamp();
        let result = EndpointProbe::new().check(Some(&url)).await;
        assert!(result.reachable, "{result:?}");
        assert!(result.checked_at >= before);
        assert!(result.checked_at <= chrono::Utc::now().timestamp());
        assert!(is_latency(&result.detail), "{}", result.detail);
        assert_eq!(result.detail, format!("{}ms", result.latency_ms.unwrap()));

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body, block_number_request());
    }

    #[tokio::test]
    async fn test_latency_includes_response_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Headers go out at once, the body only after a pause
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = br#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#;
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });

        let result = EndpointProbe::new()
            .check(Some(&format!("http://{addr}")))
            .await;
        assert!(result.reachable, "{result:?}");
        assert!(result.latency_ms.unwrap() >= 350, "{result:?}");
    }

    #[tokio::test]
    async fn test_server_error_reports_status() {
        let app = Router::new().route("/", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let url = spawn_stub(app).await;

        let result = EndpointProbe::new().check(Some(&url)).await;
        assert!(!result.reachable);
        assert_eq!(result.detail, "HTTP 500");
    }

    #[tokio::test]
    async fn test_non_200_success_is_not_healthy() {
        let app = Router::new().route("/", post(|| async { StatusCode::NO_CONTENT }));
        let url = spawn_stub(app).await;

        let result = EndpointProbe::new().check(Some(&url)).await;
        assert!(!result.reachable);
        assert_eq!(result.detail, "HTTP 204");
    }

    #[tokio::test]
    async fn test_unresponsive_endpoint_times_out() {
        let app = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                StatusCode::OK
            }),
        );
        let url = spawn_stub(app).await;

        let start = Instant::now();
        let result = EndpointProbe::new().check(Some(&url)).await;
        let elapsed = start.elapsed();

        assert!(!result.reachable);
        assert_eq!(result.detail, "connection failed");
        assert!(elapsed >= Duration::from_millis(2900), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4500), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = EndpointProbe::new()
            .check(Some(&format!("http://{addr}")))
            .await;
        assert!(!result.reachable);
        assert_eq!(result.detail, "connection failed");
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let result = EndpointProbe::new().check(Some("not a url")).await;
        assert!(!result.reachable);
        assert_eq!(result.detail, "connection failed");
    }

    #[tokio::test]
    async fn test_repeated_checks_stay_healthy() {
        let app = Router::new().route("/", post(|| async { Json(json!({"result": "0x1"})) }));
        let url = spawn_stub(app).await;
        let probe = EndpointProbe::new();

        let first = probe.check(Some(&url)).await;
        let second = probe.check(Some(&url)).await;
        assert!(first.reachable && second.reachable);
        assert!(is_latency(&first.detail));
        assert!(is_latency(&second.detail));
    }
}
