//! Change-notification webhook.

use reqwest::StatusCode;
use tracing::info;

use super::client::HttpClient;
use crate::config::{RequestConfig, RequestMethod};
use crate::error::HttpError;

/// Fires the configured webhook after each materialized or removed file.
///
/// Retry exhaustion is returned to the caller rather than logged and
/// swallowed, so a dead webhook terminates the sidecar the same way a dead
/// cluster connection does.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: HttpClient,
    request: RequestConfig,
}

impl Notifier {
    pub fn new(client: HttpClient, request: RequestConfig) -> Self {
        Self { client, request }
    }

    /// Sends the notification. Returns `None` when no URL is configured.
    pub async fn notify(&self) -> Result<Option<StatusCode>, HttpError> {
        let Some(url) = self.request.url.as_deref() else {
            return Ok(None);
        };

        let response = match self.request.method {
            RequestMethod::Get => self.client.get(url).await?,
            RequestMethod::Post => {
                self.client
                    .post_json(url, self.request.payload.as_ref())
                    .await?
            }
        };

        let status = response.status();
        info!(
            method = %self.request.method,
            url = %url,
            status = status.as_u16(),
            "{} request sent to {}. Response: {} {}",
            self.request.method,
            url,
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        Ok(Some(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;

    #[tokio::test]
    async fn test_notify_without_url_is_noop() {
        let client = HttpClient::new(RetryPolicy::default()).unwrap();
        let notifier = Notifier::new(client, RequestConfig::default());

        assert_eq!(notifier.notify().await.unwrap(), None);
    }
}
