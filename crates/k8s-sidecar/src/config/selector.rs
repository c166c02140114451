//! Equality-based label selectors for namespace fan-out.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// A set of `key=value` pairs a namespace must carry to be watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceSelector {
    match_labels: BTreeMap<String, String>,
}

impl NamespaceSelector {
    /// Parses a comma-separated list of `key=value` pairs.
    ///
    /// Whitespace around keys and values is trimmed. An empty selector, a pair
    /// without `=` or a pair with an empty key is rejected.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidSelector {
            selector: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut match_labels = BTreeMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid("expected key=value pairs"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid("label key must not be empty"));
            }
            match_labels.insert(key.to_string(), value.trim().to_string());
        }

        if match_labels.is_empty() {
            return Err(invalid("no labels given"));
        }

        Ok(Self { match_labels })
    }

    pub fn match_labels(&self) -> &BTreeMap<String, String> {
        &self.match_labels
    }

    /// Returns true if every pair of the selector is present in `labels`.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

/// Renders the selector in API query form (`a=1,b=2`).
impl fmt::Display for NamespaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}
