//! Resolves a data entry to the file it produces.

use tracing::{debug, warn};

use crate::error::SidecarError;
use crate::http::HttpClient;

/// A file ready to be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub filename: String,
    pub content: String,
}

/// Turns data keys into filenames, fetching remote content for suffix-marked keys.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    client: HttpClient,
    suffix: String,
}

impl ContentResolver {
    pub fn new(client: HttpClient, suffix: impl Into<String>) -> Self {
        Self {
            client,
            suffix: suffix.into(),
        }
    }

    pub fn is_remote(&self, key: &str) -> bool {
        !self.suffix.is_empty() && key.ends_with(&self.suffix)
    }

    /// The filename a data key materializes to, without fetching anything.
    pub fn filename_for<'a>(&self, key: &'a str) -> &'a str {
        if self.is_remote(key) {
            &key[..key.len() - self.suffix.len()]
        } else {
            key
        }
    }

    pub async fn resolve(&self, key: &str, value: &str) -> Result<ResolvedFile, SidecarError> {
        let filename = self.filename_for(key).to_string();

        if !self.is_remote(key) {
            return Ok(ResolvedFile {
                filename,
                content: value.to_string(),
            });
        }

        debug!("Fetching content for {} from {}", filename, value);
        let (status, body) =
            self.client
                .get_text(value)
                .await
                .map_err(|e| SidecarError::RemoteFetch {
                    key: key.to_string(),
                    source: e,
                })?;

        if !status.is_success() {
            warn!(
                "Fetching {} for {} returned {}, using the response body anyway",
                value, filename, status
            );
        }

        Ok(ResolvedFile {
            filename,
            content: body,
        })
    }
}
