//! Environment-driven sidecar settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::selector::NamespaceSelector;
use crate::error::ConfigError;

/// Annotation consulted for a per-resource destination folder when
/// `FOLDER_ANNOTATIONS` is not set.
pub const DEFAULT_FOLDER_ANNOTATION: &str = "k8s-sidecar-target-directory";

/// Data keys ending with this suffix hold a URL whose body becomes the file.
pub const DEFAULT_REMOTE_FETCH_SUFFIX: &str = ".url";

/// Literal `NAMESPACE` value selecting the cluster-wide stream.
pub const ALL_NAMESPACES: &str = "ALL";

/// How resources are synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// Continuous watch supervised by the resilience loop.
    Watch,
    /// A single list-and-reconcile pass.
    List,
}

/// HTTP method used for change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "GET"),
            RequestMethod::Post => write!(f, "POST"),
        }
    }
}

impl std::str::FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "POST" => Ok(RequestMethod::Post),
            _ => Err(format!("unsupported request method: {}", s)),
        }
    }
}

/// Change-notification webhook target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub method: RequestMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: RequestMethod::Get,
            payload: None,
        }
    }
}

/// Retry budget and timing for outbound HTTP calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryPolicy {
    /// Total number of retries across all failure kinds.
    pub total: u32,
    /// Retries allowed for connection failures.
    pub connect: u32,
    /// Retries allowed for failures after the request was sent.
    pub read: u32,
    /// Exponential backoff factor, in seconds.
    pub backoff_factor: f64,
    /// Timeout applied to every individual attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 5,
            connect: 5,
            read: 5,
            backoff_factor: 0.2,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unknown formats fall back to text so logging is always available.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("LOG_FORMAT").map(|f| f.to_lowercase()) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Complete sidecar configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SidecarConfig {
    /// Label key a ConfigMap must carry to be mirrored.
    pub label: String,
    /// Default destination directory.
    pub folder: PathBuf,
    /// Annotation key overriding the destination directory per resource.
    pub folder_annotation: String,
    /// Suffix marking data keys whose value is a URL to fetch.
    pub remote_fetch_suffix: String,
    /// Explicit namespace, or `ALL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Selector for namespace fan-out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<NamespaceSelector>,
    pub method: SyncMethod,
    pub request: RequestConfig,
    pub retry: RetryPolicy,
    pub skip_tls_verify: bool,
}

impl SidecarConfig {
    /// Creates a config with defaults for everything but the required settings.
    pub fn new(label: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            folder: folder.into(),
            folder_annotation: DEFAULT_FOLDER_ANNOTATION.to_string(),
            remote_fetch_suffix: DEFAULT_REMOTE_FETCH_SUFFIX.to_string(),
            namespace: None,
            namespace_selector: None,
            method: SyncMethod::Watch,
            request: RequestConfig::default(),
            retry: RetryPolicy::default(),
            skip_tls_verify: false,
        }
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let label = get("LABEL").ok_or(ConfigError::Missing("LABEL"))?;
        let folder = get("FOLDER").ok_or(ConfigError::Missing("FOLDER"))?;

        let mut config = Self::new(label, folder);

        if let Some(annotation) = get("FOLDER_ANNOTATIONS") {
            config.folder_annotation = annotation;
        }

        config.namespace = get("NAMESPACE");
        config.namespace_selector = get("NAMESPACE_LABELS")
            .map(|raw| NamespaceSelector::parse(&raw))
            .transpose()?;

        config.method = match get("METHOD") {
            Some(m) if m == "LIST" => SyncMethod::List,
            _ => SyncMethod::Watch,
        };

        config.request = RequestConfig {
            url: get("REQ_URL"),
            method: match get("REQ_METHOD") {
                Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                    key: "REQ_METHOD",
                    value: raw.clone(),
                    reason,
                })?,
                None => RequestMethod::Get,
            },
            payload: get("REQ_PAYLOAD").map(|raw| parse_payload(&raw)),
        };

        let defaults = RetryPolicy::default();
        config.retry = RetryPolicy {
            total: parse_or("REQ_RETRY_TOTAL", get("REQ_RETRY_TOTAL"), defaults.total)?,
            connect: parse_or("REQ_RETRY_CONNECT", get("REQ_RETRY_CONNECT"), defaults.connect)?,
            read: parse_or("REQ_RETRY_READ", get("REQ_RETRY_READ"), defaults.read)?,
            backoff_factor: parse_or(
                "REQ_RETRY_BACKOFF_FACTOR",
                get("REQ_RETRY_BACKOFF_FACTOR"),
                defaults.backoff_factor,
            )?,
            timeout: parse_timeout(get("REQ_TIMEOUT"), defaults.timeout)?,
        };

        config.skip_tls_verify = get("SKIP_TLS_VERIFY").is_some_and(|v| v == "true");

        Ok(config)
    }
}

/// Payloads that are not valid JSON are sent as a JSON string.
fn parse_payload(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                value: value.clone(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

fn parse_timeout(raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_or("REQ_TIMEOUT", raw.clone(), default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        key: "REQ_TIMEOUT",
        value: raw.unwrap_or_default(),
        reason: e.to_string(),
    })
}
