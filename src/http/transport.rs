//! HTTP transport for the BattleMetrics API.
//!
//! This module provides the [`HttpTransport`] struct, which sends [`Route`]s
//! with the bearer token, retries rate-limited calls and hands successful
//! bodies to the [`normalize`](crate::http::normalize) step.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::Transport;
use crate::http::normalizer::{Normalized, normalize};
use crate::http::retry::RetryPolicy;
use crate::http::route::Route;

/// Transport backed by a pooled [`reqwest::Client`].
///
/// The connection pool is opened on the first request and released by
/// [`HttpTransport::close`]. A request sent after `close` opens a new one.
///
/// # Examples
///
/// ```no_run
/// use battlemetrics::http::{HttpTransport, Method, Route, Transport};
///
/// # async fn run() -> battlemetrics::Result<()> {
/// let transport = HttpTransport::new("your_token")?;
/// let route = Route::builder(Method::Get).path("/players/42").build()?;
/// let player = transport.request(route).await?.into_json()?;
/// println!("Player: {}", player);
/// transport.close();
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    /// BattleMetrics API token, sent as a bearer token
    token: String,
    /// Policy applied to 429 responses
    retry: RetryPolicy,
    /// Per-request timeout
    timeout: Option<Duration>,
    /// Pooled HTTP client, `None` when closed
    session: Mutex<Option<Client>>,
}

impl HttpTransport {
    /// Create a new [HttpTransport].
    ///
    /// # Arguments
    ///
    /// * `token` - The BattleMetrics API token.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the token is empty.
    pub fn new(token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "the API token must not be empty".to_owned(),
            ));
        }

        Ok(HttpTransport {
            token: token.to_owned(),
            retry: RetryPolicy::default(),
            timeout: None,
            session: Mutex::new(None),
        })
    }

    /// Replace the rate-limit retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set a timeout applied to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Whether the connection pool is currently open.
    pub fn is_open(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the connection pool. In-flight requests keep their own handle
    /// and finish normally.
    pub fn close(&self) {
        let closed = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if closed.is_some() {
            debug!("HTTP session closed");
        }
    }

    /// The pooled client, opened on demand.
    fn session(&self) -> Result<Client> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        debug!("HTTP session opened");

        *session = Some(client.clone());
        Ok(client)
    }

    async fn send(&self, client: &Client, route: &Route) -> Result<Response> {
        let mut request = client
            .request(route.method().into(), route.url().clone())
            .header(ACCEPT, "application/json")
            .bearer_auth(&self.token);

        for (name, value) in route.headers() {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                warn!("ignoring Authorization header supplied for {}", route);
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(body) = route.body() {
            debug!("request body for {} -> {}", route, body_summary(body));
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

impl Transport for HttpTransport {
    /// Send `route` and normalize the response.
    ///
    /// A 429 answer is retried according to the [`RetryPolicy`], honoring the
    /// `Retry-After` header when the server sends one. Any other non-success
    /// status becomes an [`Error::Http`].
    async fn request(&self, route: Route) -> Result<Normalized> {
        let client = self.session()?;
        info!("request {}", route);

        let mut retries = 0;
        loop {
            let response = self.send(&client, &route).await?;
            let status = response.status();
            debug!("{} returned {}", route, status);

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.retry.max_retries {
                    error!("{} still rate limited after {} retries", route, retries);
                    return Err(Error::RetryExhausted {
                        attempts: retries + 1,
                    });
                }

                let delay = self.retry.delay(retries, retry_after(&response));
                retries += 1;
                warn!(
                    "rate limited on {}, retry {}/{} in {:?}",
                    route, retries, self.retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await?;
                let error = Error::from_response(status, &body);
                error!("{} failed: {}", route, error);
                return Err(error);
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = response.bytes().await?;
            let normalized = normalize(&body, content_type.as_deref())?;

            debug!("response from {} -> {:?}", route, normalized);
            return Ok(normalized);
        }
    }
}

/// Shape of a request body for the logs. Values are left out, they may hold
/// credentials.
fn body_summary(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object {{{}}}", keys.join(", "))
        }
        Value::Array(items) => format!("array of {}", items.len()),
        _ => "scalar".to_owned(),
    }
}

/// `Retry-After` in seconds. The HTTP-date form is ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::Method;
    use crate::http::ban_export::BanExpiry;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Instant;

    fn fast_retries(max_retries: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_cooldown(Duration::from_millis(10))
    }

    fn get(url: &str, path: &str) -> Route {
        Route::builder(Method::Get)
            .base(url)
            .path(path)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(
            HttpTransport::new(""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            HttpTransport::new("   "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_request_sends_token_and_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let body = r#"{"data": {"type": "player", "id": "42", "attributes": {"name": "Alice"}}}"#;

        let mock = server
            .mock("GET", "/players/42")
            .match_header("authorization", "Bearer token")
            .match_header("accept", "application/json")
            .match_query(Matcher::UrlEncoded(
                "include".to_owned(),
                "identifier".to_owned(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let route = Route::builder(Method::Get)
            .base(&url)
            .path("/players/42")
            .query("include", "identifier")
            .build()
            .unwrap();
        let normalized = transport.request(route).await.unwrap();

        mock.assert_async().await;
        let json = normalized.into_json().unwrap();
        assert_eq!(json["data"]["id"], "42");
        assert_eq!(json["data"]["attributes"]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_request_sends_json_body_and_custom_headers() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("POST", "/bans")
            .match_header("authorization", "Bearer token")
            .match_header("x-request-id", "abc")
            .match_body(Matcher::Json(json!({"data": {"type": "ban"}})))
            .with_status(201)
            .with_header("content-type", "application/vnd.api+json")
            .with_body(r#"{"data": {"type": "ban", "id": "1"}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let route = Route::builder(Method::Post)
            .base(&url)
            .path("/bans")
            .json(json!({"data": {"type": "ban"}}))
            .header("Authorization", "Bearer hijacked")
            .header("X-Request-Id", "abc")
            .build()
            .unwrap();
        let normalized = transport.request(route).await.unwrap();

        mock.assert_async().await;
        assert_eq!(normalized.into_json().unwrap()["data"]["id"], "1");
    }

    #[tokio::test]
    async fn test_rate_limited_then_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let limited = server
            .mock("GET", "/servers/1")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/servers/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"id": "1"}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap().with_retry_policy(
            RetryPolicy::default().with_cooldown(Duration::from_millis(100)),
        );
        let started = Instant::now();
        let normalized = transport.request(get(&url, "/servers/1")).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(200));
        limited.assert_async().await;
        ok.assert_async().await;
        assert_eq!(normalized.into_json().unwrap()["data"]["id"], "1");
    }

    #[tokio::test]
    async fn test_request_is_cancelled_during_backoff() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let limited = server
            .mock("GET", "/servers/1")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap().with_retry_policy(
            RetryPolicy::default().with_cooldown(Duration::from_secs(60)),
        );
        let result = tokio::time::timeout(
            Duration::from_millis(500),
            transport.request(get(&url, "/servers/1")),
        )
        .await;

        assert!(result.is_err());
        limited.assert_async().await;
    }

    #[test]
    fn test_body_summary_hides_values() {
        let summary = body_summary(&json!({"token": "secret-token"}));

        assert_eq!(summary, "object {token}");
        assert!(!summary.contains("secret-token"));
        assert_eq!(body_summary(&json!([1, 2])), "array of 2");
    }

    #[tokio::test]
    async fn test_retry_after_header_wins_over_cooldown() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/servers/1")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/servers/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap().with_retry_policy(
            RetryPolicy::default().with_cooldown(Duration::from_secs(60)),
        );
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            transport.request(get(&url, "/servers/1")),
        )
        .await;

        assert!(result.is_ok(), "Retry-After was not honored");
        assert_eq!(result.unwrap().unwrap(), Normalized::Json(json!({})));
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let limited = server
            .mock("GET", "/bans")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let transport = HttpTransport::new("token")
            .unwrap()
            .with_retry_policy(fast_retries(2));
        let error = transport.request(get(&url, "/bans")).await.unwrap_err();

        limited.assert_async().await;
        assert!(matches!(error, Error::RetryExhausted { attempts: 3 }));
        assert_eq!(error.kind(), ErrorKind::RateLimited);
        assert_eq!(error.status(), Some(429));
    }

    #[tokio::test]
    async fn test_not_found_is_a_typed_error() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/players/0")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors":[{"message":"not found"}]}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let error = transport.request(get(&url, "/players/0")).await.unwrap_err();

        assert_eq!(error.status(), Some(404));
        assert!(error.is_not_found());
        assert!(error.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_server_error_keeps_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/players/1")
            .with_status(503)
            .with_header("content-type", "text/html")
            .with_body("<h1>down</h1>")
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let error = transport.request(get(&url, "/players/1")).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Server);
        match error {
            Error::Http {
                status, raw_body, ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(raw_body.as_deref(), Some("<h1>down</h1>"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_octet_stream_export() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/ban-lists/abc/export")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body("banid 12345 \"PlayerOne\" \"cheating\" -1\n")
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let records = transport
            .request(get(&url, "/ban-lists/abc/export"))
            .await
            .unwrap()
            .into_ban_records()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "PlayerOne");
        assert_eq!(records[0].expiry, BanExpiry::Permanent);
    }

    #[tokio::test]
    async fn test_no_content_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("DELETE", "/bans/1")
            .with_status(204)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let route = Route::builder(Method::Delete)
            .base(&url)
            .path("/bans/1")
            .build()
            .unwrap();

        assert_eq!(transport.request(route).await.unwrap(), Normalized::Empty);
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        server
            .mock("GET", "/weird")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("not json")
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        let error = transport.request(get(&url, "/weird")).await.unwrap_err();

        assert!(matches!(error, Error::UnsupportedContentType(ct) if ct == "image/png"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_transport_error() {
        let transport = HttpTransport::new("token")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        let error = transport
            .request(get("http://127.0.0.1:1", "/players/1"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_session_reopens_after_close() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/games")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": []}"#)
            .expect(2)
            .create_async()
            .await;

        let transport = HttpTransport::new("token").unwrap();
        assert!(!transport.is_open());

        transport.request(get(&url, "/games")).await.unwrap();
        assert!(transport.is_open());

        transport.close();
        assert!(!transport.is_open());

        transport.request(get(&url, "/games")).await.unwrap();
        assert!(transport.is_open());
        mock.assert_async().await;
    }
}
