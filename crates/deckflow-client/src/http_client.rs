//! Shared HTTP client infrastructure for the generation service
//!
//! One `reqwest::Client` is built per service handle, with the configured
//! connect/request timeouts. Idempotent reads are retried with backoff;
//! generation and upload calls are sent exactly once.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use deckflow_utils::error::ServiceError;

use crate::wire::ErrorDetail;

/// Initial backoff duration for retries
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Longest response excerpt kept in a `Status` error
const MAX_DETAIL_CHARS: usize = 200;

/// Whether a request may be repeated without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Idempotency {
    /// GET/DELETE: retried on 5xx and network failures
    Retryable,
    /// Generation, refinement and uploads: sent once
    Once,
}

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    request_timeout: Duration,
    max_retries: u32,
}

impl HttpClient {
    /// Build a client with the given timeouts and retry budget.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Misconfiguration` if the client cannot be constructed
    pub fn new(
        request_timeout: Duration,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                ServiceError::Misconfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client: Arc::new(client),
            request_timeout,
            max_retries,
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a request and decode a JSON body.
    ///
    /// Non-2xx answers carrying `{"detail": ...}` are the service's own
    /// HTTP exceptions and surface as `Rejected`; other failures map to
    /// `Status`, `Timeout` or `Transport`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
        idempotency: Idempotency,
    ) -> Result<T, ServiceError> {
        let started = Instant::now();
        let response = self.execute(request, operation, idempotency).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(redact_error_message(&e.to_string())))?;

        debug!(
            operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "Service call completed"
        );

        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Decode(format!("{operation}: {e}")))
    }

    async fn execute(
        &self,
        request_builder: RequestBuilder,
        operation: &str,
        idempotency: Idempotency,
    ) -> Result<Response, ServiceError> {
        let budget = match idempotency {
            Idempotency::Retryable => self.max_retries,
            Idempotency::Once => 0,
        };
        let mut pending = Some(request_builder);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let Some(current) = pending.take() else {
                return Err(ServiceError::Transport(format!(
                    "{operation}: request could not be repeated"
                )));
            };
            // Keep a copy for the next attempt; multipart bodies cannot be cloned
            // and are never retried.
            if attempt <= budget {
                pending = current.try_clone();
            }

            debug!(
                operation,
                attempt,
                timeout_secs = self.request_timeout.as_secs(),
                "Executing HTTP request"
            );

            let outcome = current.timeout(self.request_timeout).send().await;
            let retry_left = attempt <= budget && pending.is_some();

            match outcome {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error = status_error(response, operation).await;
                    if status.is_server_error() && retry_left {
                        warn!(
                            operation,
                            attempt,
                            status = status.as_u16(),
                            "Server error, will retry"
                        );
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(error);
                }
                Err(e) if e.is_timeout() => {
                    return Err(ServiceError::Timeout {
                        duration: self.request_timeout,
                    });
                }
                Err(e) => {
                    let message = redact_error_message(&e.to_string());
                    if retry_left {
                        warn!(operation, attempt, error = %message, "Network error, will retry");
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(ServiceError::Transport(format!(
                        "{operation} request failed: {message}"
                    )));
                }
            }
        }
    }
}

/// Turn a non-2xx response into a `ServiceError`.
async fn status_error(response: Response, operation: &str) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    map_status(status, &body, operation)
}

fn map_status(status: StatusCode, body: &str, operation: &str) -> ServiceError {
    if let Ok(detail) = serde_json::from_str::<ErrorDetail>(body) {
        return ServiceError::Rejected {
            operation: operation.to_string(),
            message: detail.message(),
        };
    }

    let excerpt: String = body.trim().chars().take(MAX_DETAIL_CHARS).collect();
    ServiceError::Status {
        status: status.as_u16(),
        detail: if excerpt.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            redact_error_message(&excerpt)
        },
    }
}

/// Pattern to match URLs with embedded credentials
static URL_WITH_CREDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)[^:@\s/]+:[^@\s/]+@").expect("credential pattern is valid")
});

/// Pattern to match potential tokens (long alphanumeric strings)
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_-])[A-Za-z0-9_-]{32,}(?:[^A-Za-z0-9_-]|$)")
        .expect("token pattern is valid")
});

/// Redact sensitive information from error messages before they are logged
/// or surfaced: embedded URL credentials and long key-like tokens.
pub(crate) fn redact_error_message(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = POTENTIAL_KEY.replace_all(&redacted, "[REDACTED_KEY]");
    redacted.to_string()
}

/// Test seam; not part of public API stability guarantees.
#[doc(hidden)]
pub fn redact_error_message_for_testing(message: &str) -> String {
    redact_error_message(message)
}
