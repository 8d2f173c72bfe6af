//! Outbound HTTP with one shared retry policy.
//!
//! Transient failures (connection errors, 429, 5xx) of reads are retried with
//! exponential backoff by `reqwest-retry`. Requests that create something on
//! the remote side (contacts, sales orders, payment intents, token grants)
//! are sent exactly once: a timeout there surfaces as a failed step.

use reqwest::{Method, RequestBuilder, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::Value;
use std::time::Duration;

use crate::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// Per attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.min_backoff, self.max_backoff)
            .build_with_max_retries(self.max_retries)
    }
}

/// Requests are built with plain `reqwest` and executed through one of two
/// middleware stacks depending on whether they are safe to replay.
#[derive(Clone)]
pub struct HttpClient {
    raw: reqwest::Client,
    retrying: ClientWithMiddleware,
    once: ClientWithMiddleware,
}

impl HttpClient {
    pub fn new(policy: &RetryPolicy) -> Result<Self, GatewayError> {
        let raw = reqwest::Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!("homeverse-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport { endpoint: "client".into(), message: e.to_string() })?;
        Ok(Self::with_client(raw, policy))
    }

    pub fn with_client(raw: reqwest::Client, policy: &RetryPolicy) -> Self {
        let retrying = ClientBuilder::new(raw.clone())
            .with(RetryTransientMiddleware::new_with_policy(policy.backoff()))
            .build();
        let once = ClientBuilder::new(raw.clone()).build();
        Self { raw, retrying, once }
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.raw.request(method, url)
    }

    /// Sends the request; non-2xx responses become [`GatewayError::Status`].
    pub async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<Response, GatewayError> {
        let request = builder.build().map_err(|e| transport(endpoint, e))?;
        let client = if is_replayable(request.method()) { &self.retrying } else { &self.once };
        let response = client.execute(request).await.map_err(|e| transport(endpoint, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(endpoint, status = status.as_u16(), "request rejected");
        Err(GatewayError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    pub async fn send_json(&self, builder: RequestBuilder, endpoint: &str) -> Result<Value, GatewayError> {
        let response = self.send(builder, endpoint).await?;
        response.json::<Value>().await.map_err(|e| GatewayError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

fn is_replayable(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn transport(endpoint: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Transport { endpoint: endpoint.to_string(), message: err.to_string() }
}

/// Best human-readable message in an error body: `message`, then Stripe's
/// `error.message`, then OAuth's `error`, then the raw text.
pub fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let found = [&json["message"], &json["error"]["message"], &json["error"]]
        .into_iter()
        .find_map(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());
    found
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Local HTTP server answering the n-th connection with `replies[n]`
    /// (the last entry repeats). `None` reads the request and never answers.
    pub(crate) struct TestServer {
        pub url: String,
        hits: Arc<AtomicUsize>,
        requests: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl TestServer {
        pub(crate) async fn start(replies: Vec<Option<(u16, &'static str)>>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let hits = Arc::new(AtomicUsize::new(0));
            let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
            let (counter, log) = (hits.clone(), requests.clone());
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let reply = replies.get(n).or(replies.last()).copied().flatten();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let head = read_request(&mut socket).await;
                        log.lock().unwrap().push(head);
                        match reply {
                            Some((status, body)) => {
                                let response = format!(
                                    "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                                    body.len()
                                );
                                let _ = socket.write_all(response.as_bytes()).await;
                                let _ = socket.shutdown().await;
                            }
                            None => tokio::time::sleep(Duration::from_secs(10)).await,
                        }
                    });
                }
            });
            Self { url, hits, requests }
        }

        pub(crate) fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        /// Request lines and headers as received, in arrival order.
        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return String::from_utf8_lossy(&buf).into_owned();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).into_owned();
                let length = head
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return head;
                }
            }
        }
    }

    /// Short timeouts and backoff, no proxy, for talking to a [`TestServer`].
    pub(crate) fn local_client() -> HttpClient {
        let policy = RetryPolicy {
            max_retries: 2,
            min_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            timeout: Duration::from_millis(300),
        };
        let raw = reqwest::Client::builder().timeout(policy.timeout).no_proxy().build().unwrap();
        HttpClient::with_client(raw, &policy)
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"code": 1001, "message": "Invalid value passed for customer_id"}"#), "Invalid value passed for customer_id");
        assert_eq!(error_message(r#"{"error": {"type": "card_error", "message": "Your card was declined."}}"#), "Your card was declined.");
        assert_eq!(error_message(r#"{"error": "invalid_code"}"#), "invalid_code");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"unexpected": true}"#), r#"{"unexpected": true}"#);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert!(HttpClient::new(&policy).is_ok());
    }

    #[tokio::test]
    async fn test_rate_limited_get_is_retried() {
        let server = TestServer::start(vec![
            Some((429, r#"{"message": "slow down"}"#)),
            Some((429, r#"{"message": "slow down"}"#)),
            Some((200, r#"{"code": 0, "items": []}"#)),
        ])
        .await;
        let http = local_client();
        let body = http.send_json(http.request(Method::GET, &format!("{}/items", server.url)), "items").await.unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_server_errors_surface_after_retries_run_out() {
        let server = TestServer::start(vec![Some((503, r#"{"message": "maintenance"}"#))]).await;
        let http = local_client();
        let err = http.send(http.request(Method::GET, &format!("{}/items", server.url)), "items").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 503, ref message, .. } if message == "maintenance"));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_post_is_sent_once_on_timeout() {
        let server = TestServer::start(vec![None]).await;
        let http = local_client();
        let request = http.request(Method::POST, &format!("{}/salesorders", server.url)).body(r#"{"customer_id": "1"}"#);
        let err = http.send(request, "salesorders").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_post_is_sent_once_on_server_error() {
        let server = TestServer::start(vec![Some((502, "Bad Gateway"))]).await;
        let http = local_client();
        let request = http.request(Method::POST, &format!("{}/contacts", server.url)).body("{}");
        let err = http.send(request, "contacts").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 502, .. }));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(server.hits(), 1);
    }
}
