//! Bounded retry around one logical request plus `{error, data}` decoding.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::request::RequestSpec;
use crate::common::{RetryPolicy, TransportFailure, UploadError};

/// Response wrapper every endpoint of the upload service uses.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// HTTP transport that re-sends a request on connection errors and timeouts.
#[derive(Debug, Clone, Default)]
pub struct RetryingTransport {
    client: reqwest::Client,
}

impl RetryingTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send `spec`, retrying transport failures per `policy`, and decode the
    /// `data` member of the reply as `T`.
    ///
    /// Application errors and malformed replies are returned at once; only
    /// failures where no response arrived are retried.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        spec: &RequestSpec<'_>,
        policy: &RetryPolicy,
    ) -> Result<T, UploadError> {
        let max_attempts = policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!("{} attempt {}/{}", operation, attempt, max_attempts);

            match self.attempt_once(spec, policy.timeout).await? {
                Ok((status, body)) => return decode_envelope(status, &body),
                Err(failure) if attempt < max_attempts => {
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying...",
                        operation, attempt, max_attempts, failure
                    );
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
                Err(failure) => {
                    warn!(
                        "{} failed after {} attempt(s): {}",
                        operation, attempt, failure
                    );
                    return Err(UploadError::RetryExhausted {
                        operation,
                        attempts: attempt,
                        source: failure,
                    });
                }
            }
        }
    }

    // Outer error: the request could not even be built (local I/O).
    // Inner error: the attempt produced no response within budget.
    async fn attempt_once(
        &self,
        spec: &RequestSpec<'_>,
        timeout: Duration,
    ) -> Result<Result<(StatusCode, bytes::Bytes), TransportFailure>, UploadError> {
        let request = spec.build(&self.client).await?;

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        Ok(match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) if err.is_timeout() => Err(TransportFailure::Timeout(timeout)),
            Ok(Err(err)) => Err(TransportFailure::Connection(err)),
            Err(_) => Err(TransportFailure::Timeout(timeout)),
        })
    }
}

/// Turn a raw reply into typed `data`, regardless of HTTP status.
pub fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, UploadError> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if status == StatusCode::UNAUTHORIZED => return Err(UploadError::Unauthorized),
        Err(err) => {
            return Err(UploadError::Protocol(format!(
                "response is not a JSON envelope (HTTP {status}): {err}"
            )))
        }
    };

    if let Some(message) = envelope.error.filter(|m| !m.is_empty()) {
        return Err(UploadError::Application(message));
    }

    let Some(data) = envelope.data.filter(|d| !d.is_null()) else {
        if status == StatusCode::UNAUTHORIZED {
            return Err(UploadError::Unauthorized);
        }
        return Err(UploadError::empty_data());
    };

    serde_json::from_value(data)
        .map_err(|err| UploadError::Protocol(format!("unexpected data shape: {err}")))
}
