//! Client for the DNS analysis API.
//!
//! A lookup is a single JSON POST. Each attempt is bounded by a timeout and
//! failed attempts are retried with a fixed delay, surfacing the last error
//! once the retry budget is spent.

use crate::error::DnsIntelError;
use crate::types::{LookupOptions, LookupRequest};
use std::future::Future;
use std::time::{Duration, Instant};
use url::Url;

/// Hard upper bound for a single attempt, whatever the options say.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Header carrying the bot-mitigation challenge token.
pub const CHALLENGE_TOKEN_HEADER: &str = "X-Turnstile-Token";

/// How failed attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Retry policy carried by lookup options.
    pub fn from_options(options: &LookupOptions) -> Self {
        Self {
            max_retries: options.max_retries,
            delay: Duration::from_millis(options.retry_delay),
        }
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Run `operation` until it succeeds or the retry budget is exhausted.
///
/// The operation receives the zero-based attempt number. Between attempts
/// the policy's delay is awaited. When every attempt fails, the error from
/// the final attempt is returned.
pub async fn retry_with_delay<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, DnsIntelError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DnsIntelError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "lookup attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Per-attempt timeout for the given options, capped at [`MAX_REQUEST_TIMEOUT`].
pub fn attempt_timeout(options: &LookupOptions) -> Duration {
    Duration::from_millis(options.timeout).min(MAX_REQUEST_TIMEOUT)
}

/// Interpret an API response.
///
/// The body is parsed only when non-empty. A non-2xx status surfaces the
/// server's `error` field when there is one. An empty successful body
/// yields `Value::Null`, which callers treat as a malformed result.
pub fn interpret_response(status: u16, body: &str) -> Result<serde_json::Value, DnsIntelError> {
    let data = if body.is_empty() {
        None
    } else {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => Some(value),
            Err(_) => {
                return Err(DnsIntelError::ParseError {
                    message: "Invalid JSON response from API".to_string(),
                    content: Some(body.chars().take(200).collect()),
                })
            }
        }
    };

    if !(200..300).contains(&status) {
        let message = data
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(|e| e.as_str())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        return Err(DnsIntelError::api(status, message));
    }

    Ok(data.unwrap_or(serde_json::Value::Null))
}

/// HTTP client for the analysis API.
///
/// Holds no per-lookup state; one instance can serve any number of lookups.
#[derive(Clone)]
pub struct ApiClient {
    /// HTTP client for making API requests
    http_client: reqwest::Client,
    /// Endpoint lookups are POSTed to
    endpoint: Url,
}

impl ApiClient {
    /// Create a client for the given endpoint.
    ///
    /// The endpoint must be an absolute http(s) URL.
    pub fn new(endpoint: &str) -> Result<Self, DnsIntelError> {
        let endpoint = parse_endpoint(endpoint)?;

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("dns-intel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DnsIntelError::network_with_source("Failed to create API HTTP client", e.to_string())
            })?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// The endpoint lookups are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Look up one domain, retrying per the options' retry policy.
    ///
    /// # Arguments
    ///
    /// * `domain` - Validated domain to analyze
    /// * `options` - Lookup options (also carry timeout and retry settings)
    /// * `token` - Challenge token, sent as `X-Turnstile-Token` when present
    ///
    /// # Returns
    ///
    /// The parsed JSON body of the first successful attempt.
    pub async fn lookup(
        &self,
        domain: &str,
        options: &LookupOptions,
        token: Option<&str>,
    ) -> Result<serde_json::Value, DnsIntelError> {
        let request = LookupRequest::new(domain, options);
        let policy = RetryPolicy::from_options(options);
        let timeout = attempt_timeout(options);
        let start = Instant::now();

        let result = retry_with_delay(&policy, |attempt| {
            let request = &request;
            async move {
                tracing::debug!(
                    domain,
                    attempt = attempt + 1,
                    endpoint = %self.endpoint,
                    "sending lookup request"
                );
                self.send_once(request, timeout, token).await
            }
        })
        .await;

        match &result {
            Ok(_) => tracing::info!(
                domain,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "lookup succeeded"
            ),
            Err(e) => tracing::warn!(domain, error = %e, "lookup failed"),
        }

        result
    }

    /// Make a single attempt, aborting it when it exceeds `timeout`.
    async fn send_once(
        &self,
        request: &LookupRequest,
        timeout: Duration,
        token: Option<&str>,
    ) -> Result<serde_json::Value, DnsIntelError> {
        match tokio::time::timeout(timeout, self.post(request, token)).await {
            Ok(result) => result,
            Err(_) => Err(DnsIntelError::timeout("API request", timeout)),
        }
    }

    async fn post(
        &self,
        request: &LookupRequest,
        token: Option<&str>,
    ) -> Result<serde_json::Value, DnsIntelError> {
        let mut builder = self.http_client.post(self.endpoint.clone()).json(request);

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            builder = builder.header(CHALLENGE_TOKEN_HEADER, token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            DnsIntelError::network_with_source("Failed to read API response", e.to_string())
        })?;

        tracing::debug!(status, bytes = body.len(), "received API response");
        interpret_response(status, &body)
    }
}

/// Parse and check an API endpoint URL.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, DnsIntelError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(DnsIntelError::config(
            "No API endpoint configured (set --endpoint, DI_ENDPOINT or [api].endpoint)",
        ));
    }

    let url = Url::parse(trimmed)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DnsIntelError::config(format!(
            "API endpoint must use http or https, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_retry_succeeds_after_two_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_with_delay(&policy, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DnsIntelError::network(format!("failure {}", n)))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_retry_surfaces_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_delay(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(DnsIntelError::api(500, format!("attempt {}", attempt + 1))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(DnsIntelError::ApiError { message, .. }) => assert_eq!(message, "attempt 3"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_skips_non_retryable_errors() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_delay(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DnsIntelError::MissingChallengeToken) }
        })
        .await;

        assert!(matches!(result, Err(DnsIntelError::MissingChallengeToken)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_delay(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DnsIntelError::network("down")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interpret_response() {
        let ok = interpret_response(200, r#"{"results": []}"#).unwrap();
        assert_eq!(ok["results"], serde_json::json!([]));

        assert_eq!(interpret_response(204, "").unwrap(), serde_json::Value::Null);

        match interpret_response(200, "<html>oops</html>") {
            Err(DnsIntelError::ParseError { message, .. }) => {
                assert_eq!(message, "Invalid JSON response from API")
            }
            other => panic!("unexpected: {:?}", other),
        }

        match interpret_response(429, r#"{"error": "Rate limit exceeded"}"#) {
            Err(DnsIntelError::ApiError { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match interpret_response(503, "") {
            Err(DnsIntelError::ApiError { message, .. }) => {
                assert_eq!(message, "Request failed with status 503")
            }
            other => panic!("unexpected: {:?}", other),
        }

        // Unparseable body wins over the status
        assert!(matches!(
            interpret_response(500, "not json"),
            Err(DnsIntelError::ParseError { .. })
        ));
    }

    #[test]
    fn test_attempt_timeout_is_capped() {
        let options = LookupOptions {
            timeout: 1_000_000,
            ..Default::default()
        };
        assert_eq!(attempt_timeout(&options), MAX_REQUEST_TIMEOUT);
        assert_eq!(
            attempt_timeout(&LookupOptions::default()),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("https://api.example.com/analyze").is_ok());
        assert!(matches!(parse_endpoint(""), Err(DnsIntelError::ConfigError { .. })));
        assert!(matches!(
            parse_endpoint("ftp://api.example.com"),
            Err(DnsIntelError::ConfigError { .. })
        ));
        assert!(parse_endpoint("not a url").is_err());
    }

    // ── Loopback stub ────────────────────────────────────────────────────────

    /// Serve canned responses, one per connection, recording each request.
    /// A `None` response accepts the connection and never answers.
    async fn spawn_stub(responses: Vec<Option<(u16, String)>>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);

                match response {
                    Some((status, body)) => {
                        let reply = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(reply.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            }
        });

        (format!("http://{}/analyze", addr), requests)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn quick_options(max_retries: u32) -> LookupOptions {
        LookupOptions {
            timeout: 2000,
            max_retries,
            retry_delay: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_sends_token_and_body() {
        let body = r#"{"results":[{"domain":"example.com","lookupResult":{"records":{}}}]}"#;
        let (endpoint, requests) = spawn_stub(vec![Some((200, body.to_string()))]).await;
        let client = ApiClient::new(&endpoint).unwrap();

        let value = client
            .lookup("example.com", &quick_options(0), Some("tok-123"))
            .await
            .unwrap();
        assert_eq!(value["results"][0]["domain"], "example.com");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("post /analyze"));
        assert!(request.contains("x-turnstile-token: tok-123"));
        assert!(request.contains("content-type: application/json"));
        assert!(requests[0].contains(r#""domains":["example.com"]"#));
        assert!(requests[0].contains(r#""includeMetadata":false"#));
    }

    #[tokio::test]
    async fn test_lookup_omits_empty_token() {
        let (endpoint, requests) = spawn_stub(vec![Some((200, "{}".to_string()))]).await;
        let client = ApiClient::new(&endpoint).unwrap();

        client.lookup("example.com", &quick_options(0), Some("")).await.unwrap();

        let requests = requests.lock().unwrap();
        assert!(!requests[0].to_ascii_lowercase().contains("x-turnstile-token"));
    }

    #[tokio::test]
    async fn test_lookup_retries_server_errors() {
        let (endpoint, requests) = spawn_stub(vec![
            Some((500, r#"{"error":"upstream resolver failed"}"#.to_string())),
            Some((200, r#"{"results":[]}"#.to_string())),
        ])
        .await;
        let client = ApiClient::new(&endpoint).unwrap();

        let value = client.lookup("example.com", &quick_options(1), None).await.unwrap();
        assert_eq!(value["results"], serde_json::json!([]));
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_reports_invalid_json() {
        let (endpoint, _) = spawn_stub(vec![Some((200, "<html></html>".to_string()))]).await;
        let client = ApiClient::new(&endpoint).unwrap();

        let err = client
            .lookup("example.com", &quick_options(0), None)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid JSON response from API");
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let (endpoint, _) = spawn_stub(vec![None]).await;
        let client = ApiClient::new(&endpoint).unwrap();
        let options = LookupOptions {
            timeout: 100,
            max_retries: 0,
            ..Default::default()
        };

        let err = client.lookup("example.com", &options, None).await.unwrap_err();
        assert!(matches!(err, DnsIntelError::Timeout { .. }));
    }
}
