//! HTTP client with a bounded retry budget and exponential backoff.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::HttpError;

/// Statuses that trigger a retry.
pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Upper bound for a single backoff sleep.
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Which retry counter a failed attempt is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Connect,
    Read,
    Status,
    Other,
}

/// Remaining retries for one logical request.
#[derive(Debug, Clone)]
struct RetryBudget {
    total: i64,
    connect: i64,
    read: i64,
}

impl RetryBudget {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            total: i64::from(policy.total),
            connect: i64::from(policy.connect),
            read: i64::from(policy.read),
        }
    }

    /// Charges one failure. Returns false once any counter is exhausted.
    fn consume(&mut self, failure: Failure) -> bool {
        self.total -= 1;
        match failure {
            Failure::Connect => self.connect -= 1,
            Failure::Read => self.read -= 1,
            Failure::Status | Failure::Other => {}
        }
        self.total >= 0 && self.connect >= 0 && self.read >= 0
    }
}

impl RetryPolicy {
    /// Sleep before the `retry`-th retry (1-based). The first retry is immediate.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let millis = (self.backoff_factor * 1000.0 * 2f64.powi(exponent)).round() as u64;
        Duration::from_millis(millis).min(BACKOFF_MAX)
    }
}

fn classify(err: &reqwest::Error) -> Failure {
    if err.is_connect() {
        Failure::Connect
    } else if err.is_timeout() || err.is_body() || err.is_decode() || err.is_request() {
        Failure::Read
    } else {
        Failure::Other
    }
}

/// Shared HTTP client for remote content fetches and notifications.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { client, policy })
    }

    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.send(url, true, || self.client.get(url)).await
    }

    /// POST is not idempotent: only connection failures are retried, and a
    /// retryable status is returned to the caller as is.
    pub async fn post_json(
        &self,
        url: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<Response, HttpError> {
        self.send(url, false, || {
            let request = self.client.post(url);
            match payload {
                Some(body) => request.json(body),
                None => request,
            }
        })
        .await
    }

    /// Fetches `url` and returns its body as text.
    pub async fn get_text(&self, url: &str) -> Result<(StatusCode, String), HttpError> {
        let response = self.get(url).await?;
        let status = response.status();
        let body = response.text().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            source: e,
        })?;
        Ok((status, body))
    }

    async fn send<F>(&self, url: &str, idempotent: bool, build: F) -> Result<Response, HttpError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut budget = RetryBudget::new(&self.policy);
        let mut retry = 0;

        loop {
            match build().send().await {
                Ok(response)
                    if idempotent && RETRY_STATUSES.contains(&response.status().as_u16()) =>
                {
                    let status = response.status().as_u16();
                    if !budget.consume(Failure::Status) {
                        return Err(HttpError::RetriesExhausted {
                            url: url.to_string(),
                            status,
                        });
                    }
                    warn!("Request to {} returned {}, retrying", url, status);
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    let failure = classify(&e);
                    let retryable = idempotent || failure == Failure::Connect;
                    if !retryable || !budget.consume(failure) {
                        return Err(HttpError::Request {
                            url: url.to_string(),
                            source: e,
                        });
                    }
                    warn!("Request to {} failed ({:?}): {}, retrying", url, failure, e);
                }
            }

            retry += 1;
            let delay = self.policy.backoff(retry);
            debug!("Retry {} for {} in {:?}", retry, url, delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            backoff_factor: 10.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(30), BACKOFF_MAX);
    }

    #[test]
    fn test_backoff_zero_factor() {
        let policy = RetryPolicy {
            backoff_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(5), Duration::ZERO);
    }

    #[test]
    fn test_budget_total_exhaustion() {
        let mut budget = RetryBudget::new(&RetryPolicy {
            total: 2,
            ..RetryPolicy::default()
        });
        assert!(budget.consume(Failure::Status));
        assert!(budget.consume(Failure::Status));
        assert!(!budget.consume(Failure::Status));
    }

    #[test]
    fn test_budget_connect_exhaustion_before_total() {
        let mut budget = RetryBudget::new(&RetryPolicy {
            total: 5,
            connect: 1,
            ..RetryPolicy::default()
        });
        assert!(budget.consume(Failure::Connect));
        assert!(!budget.consume(Failure::Connect));
    }

    #[test]
    fn test_budget_read_failures_do_not_touch_connect() {
        let mut budget = RetryBudget::new(&RetryPolicy {
            total: 3,
            connect: 0,
            read: 3,
            ..RetryPolicy::default()
        });
        assert!(budget.consume(Failure::Read));
        assert!(budget.consume(Failure::Read));
        assert!(!budget.consume(Failure::Connect));
    }

    #[test]
    fn test_zero_budget_fails_on_first_error() {
        let mut budget = RetryBudget::new(&RetryPolicy {
            total: 0,
            ..RetryPolicy::default()
        });
        assert!(!budget.consume(Failure::Other));
    }
}
