//! HTTP transport shared by every collaborator binding
//!
//! Wraps `reqwest` with the boundary policy the orchestrator relies on:
//! each call gets a hard timeout and a bounded number of retries with
//! exponential backoff. Queries retry every [`GatewayError::is_retryable`]
//! failure; calls that change the project retry only
//! [`GatewayError::is_undelivered`] ones. The orchestrator never sees an
//! intermediate attempt.

use crate::error::GatewayError;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Network location of a collaborator service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Host name
    pub host: String,
    /// TCP port
    pub port: u16,
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Endpoint {
    /// Plain HTTP endpoint
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: default_scheme(),
            host: host.into(),
            port,
        }
    }

    /// `scheme://host:port`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Per-call timeout and bounded retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    /// Budget for one attempt, including reading the body
    pub timeout: Duration,
    /// Extra attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Ceiling for the doubled delay
    pub max_backoff: Duration,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl TransportPolicy {
    /// Single attempt, no retry
    #[must_use]
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// JSON-over-HTTP client for one collaborator
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: String,
    base_url: String,
    http: reqwest::Client,
    policy: TransportPolicy,
}

impl ServiceClient {
    /// Client for a service at `endpoint`
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn new(
        service: impl Into<String>,
        endpoint: &Endpoint,
        policy: TransportPolicy,
    ) -> Result<Self, GatewayError> {
        Self::with_base_url(service, endpoint.base_url(), policy)
    }

    /// Client for a service at an explicit base URL
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn with_base_url(
        service: impl Into<String>,
        base_url: impl Into<String>,
        policy: TransportPolicy,
    ) -> Result<Self, GatewayError> {
        Self::with_headers(service, base_url, HeaderMap::new(), policy)
    }

    /// Client that sends `headers` with every request
    ///
    /// Credentials belong here rather than in the URL: request URLs appear
    /// in transport error messages and logs.
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn with_headers(
        service: impl Into<String>,
        base_url: impl Into<String>,
        headers: HeaderMap,
        policy: TransportPolicy,
    ) -> Result<Self, GatewayError> {
        let service = service.into();
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Config {
                service: service.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            policy,
        })
    }

    /// Service name used in errors and logs
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Base URL without trailing slash
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON answer
    ///
    /// For calls without side effects: every retryable failure is retried
    /// within the policy.
    ///
    /// # Errors
    /// The last attempt's error once retries are exhausted, or the first
    /// non-retryable error.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        self.send(path, body, GatewayError::is_retryable).await
    }

    /// POST a call that changes the project (build goals, recipe execution)
    ///
    /// Only failures where the request never reached the service are
    /// retried. A timeout or an error status may mean the service is still
    /// working on the first request, so it is never sent twice.
    ///
    /// # Errors
    /// As [`ServiceClient::post_json`].
    pub async fn post_command<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        self.send(path, body, GatewayError::is_undelivered).await
    }

    async fn send<B, R>(
        &self,
        path: &str,
        body: &B,
        resend: fn(&GatewayError) -> bool,
    ) -> Result<R, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            debug!(service = %self.service, path, attempt, "POST");
            let result = match tokio::time::timeout(self.policy.timeout, self.attempt(&url, body)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout {
                    service: self.service.clone(),
                    after_ms: u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if resend(&err) && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff_after(attempt);
                    attempt += 1;
                    warn!(
                        service = %self.service,
                        attempt,
                        delay = ?delay,
                        "retrying after error: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<B, R>(&self, url: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| self.transport(source))?;

        let status = response.status();
        let text = response.text().await.map_err(|source| self.transport(source))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                service: self.service.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Decode {
            service: self.service.clone(),
            message: e.to_string(),
        })
    }

    fn transport(&self, source: reqwest::Error) -> GatewayError {
        GatewayError::Transport {
            service: self.service.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_base_url() {
        assert_eq!(Endpoint::new("localhost", 8005).base_url(), "http://localhost:8005");
    }

    #[test]
    fn backoff_doubles_up_to_ceiling() {
        let policy = TransportPolicy {
            timeout: Duration::from_secs(1),
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_after(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(350));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client =
            ServiceClient::with_base_url("advisor", "http://example.test/v1beta/", TransportPolicy::default())
                .unwrap();
        assert_eq!(client.base_url(), "http://example.test/v1beta");
        assert_eq!(client.service(), "advisor");
    }
}
