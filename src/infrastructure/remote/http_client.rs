use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::TextFetcher;
use crate::core::constants::network;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::HttpConfig;

/// Whether a failed request is worth repeating
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorType {
    /// Timeouts, connection problems, 5xx and 429
    Transient(String),
    /// Everything else, e.g. 404 or 403
    Permanent(String),
}

/// Retry policy for transient failures
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl RetryOptions {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            retry_count: config.retry_count,
            retry_delay_ms: config.retry_delay_ms,
        }
    }

    /// delay * 2^(attempt-1), capped
    fn delay(&self, attempt: u32) -> Duration {
        let ms = self
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(ms.min(network::MAX_RETRY_DELAY_MS))
    }
}

fn classify_status(status: StatusCode) -> ErrorType {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ErrorType::Transient(format!("server error (HTTP {})", status.as_u16()))
    } else {
        ErrorType::Permanent(format!("unexpected response (HTTP {})", status.as_u16()))
    }
}

fn classify_error(error: &reqwest::Error) -> ErrorType {
    if error.is_timeout() {
        ErrorType::Transient(format!("request timed out: {error}"))
    } else if error.is_connect() || error.is_request() {
        ErrorType::Transient(format!("connection failed: {error}"))
    } else {
        ErrorType::Permanent(error.to_string())
    }
}

/// HTTP client wrapper with a per-request timeout and bounded retries
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryOptions,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(network::USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("unable to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: RetryOptions::from_config(config),
        })
    }

    /// Send the request built by `build`, repeating it on transient failures
    pub async fn send_with_retry<F>(&self, url: &str, build: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(url, attempt, "sending request");

            let failure = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => classify_status(response.status()),
                Err(e) => classify_error(&e),
            };

            match failure {
                ErrorType::Permanent(msg) => {
                    return Err(AppError::network(format!("request to {url}: {msg}")));
                }
                ErrorType::Transient(msg) => {
                    if attempt > self.retry.retry_count {
                        return Err(AppError::network(format!(
                            "request to {url}: {msg} (gave up after {attempt} attempts)"
                        )));
                    }
                    let delay = self.retry.delay(attempt);
                    warn!(
                        url,
                        attempt,
                        "request failed: {msg}, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// POST a JSON body with a bearer token and decode the JSON response
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self
            .send_with_retry(url, || self.client.post(url).bearer_auth(token).json(body))
            .await?;
        response
            .json()
            .await
            .map_err(|e| AppError::network(format!("unable to decode response from {url}: {e}")))
    }
}

#[async_trait]
impl TextFetcher for HttpClient {
    async fn get_text(&self, url: &str) -> AppResult<String> {
        let response = self.send_with_retry(url, || self.client.get(url)).await?;
        response
            .text()
            .await
            .map_err(|e| AppError::network(format!("unable to read body of {url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client(retry_count: u32) -> HttpClient {
        let config = HttpConfig {
            timeout_secs: 5,
            retry_count,
            retry_delay_ms: 1,
        };
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_retry_delay_backoff() {
        let retry = RetryOptions {
            retry_count: 5,
            retry_delay_ms: 100,
        };
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(3), Duration::from_millis(400));
        assert_eq!(retry.delay(40), Duration::from_millis(network::MAX_RETRY_DELAY_MS));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            ErrorType::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorType::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            ErrorType::Permanent(_)
        ));
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/tool_1.0.0_SHA256SUMS");
            then.status(200).body("abc  tool_1.0.0_linux_amd64.zip\n");
        });

        let client = test_client(2);
        let body = client
            .get_text(&server.url("/tool_1.0.0_SHA256SUMS"))
            .await
            .unwrap();
        assert_eq!(body, "abc  tool_1.0.0_linux_amd64.zip\n");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("Not Found");
        });

        let client = test_client(3);
        let err = client.get_text(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(err, AppError::Network { .. }));
        assert!(err.to_string().contains("404"), "{err}");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let client = test_client(2);
        let err = client.get_text(&server.url("/flaky")).await.unwrap_err();
        assert!(err.to_string().contains("gave up after 3 attempts"), "{err}");
        assert_eq!(mock.calls(), 3);
    }
}
