use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Failed to fetch remote content for key '{key}': {source}")]
    RemoteFetch {
        key: String,
        #[source]
        source: HttpError,
    },

    #[error("Notification failed: {0}")]
    Notification(#[source] HttpError),

    #[error("Failed to set up HTTP client: {0}")]
    HttpClient(#[source] HttpError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid namespace selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Failures reported by the cluster API or the connection to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("API error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl ClusterError {
    /// Returns the HTTP-like status code if the API reported one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClusterError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => ClusterError::Api {
                code: response.code,
                reason: response.reason,
                message: response.message,
            },
            kube::Error::HyperError(e) => ClusterError::Transport(e.to_string()),
            kube::Error::Service(e) => ClusterError::Transport(e.to_string()),
            kube::Error::ReadEvents(e) => ClusterError::Transport(e.to_string()),
            kube::Error::HttpError(e) => ClusterError::Transport(e.to_string()),
            other => ClusterError::Client(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to '{url}' exhausted its retries (last status {status})")]
    RetriesExhausted { url: String, status: u16 },

    #[error("Failed to read response body from '{url}': {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to init log tracer: {0}")]
    LogTracer(#[from] tracing_log::log_tracer::SetLoggerError),

    #[error("Failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Category of a failure, evaluated once where the failure surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    TransientCluster,
    FatalCluster,
    RemoteFetch,
    Notification,
    Filesystem,
}

/// What the supervisor does about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Tear down the watch and start again from a full re-list.
    Restart,
    /// Terminate; an external supervisor restarts the process.
    Fatal,
}

impl ErrorKind {
    pub fn recovery(self) -> Recovery {
        match self {
            ErrorKind::TransientCluster => Recovery::Restart,
            ErrorKind::Configuration
            | ErrorKind::FatalCluster
            | ErrorKind::RemoteFetch
            | ErrorKind::Notification
            | ErrorKind::Filesystem => Recovery::Fatal,
        }
    }
}

impl SidecarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SidecarError::Config(_) | SidecarError::HttpClient(_) | SidecarError::Telemetry(_) => {
                ErrorKind::Configuration
            }
            SidecarError::Cluster(ClusterError::Api { code: 500, .. }) => ErrorKind::FatalCluster,
            SidecarError::Cluster(ClusterError::Api { .. })
            | SidecarError::Cluster(ClusterError::Transport(_)) => ErrorKind::TransientCluster,
            SidecarError::Cluster(ClusterError::Client(_)) => ErrorKind::FatalCluster,
            SidecarError::RemoteFetch { .. } => ErrorKind::RemoteFetch,
            SidecarError::Notification(_) => ErrorKind::Notification,
            SidecarError::Storage(_) => ErrorKind::Filesystem,
        }
    }

    /// Returns true if the supervisor should restart the watch.
    pub fn is_recoverable(&self) -> bool {
        self.kind().recovery() == Recovery::Restart
    }
}

pub type Result<T> = std::result::Result<T, SidecarError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: u16) -> SidecarError {
        SidecarError::Cluster(ClusterError::Api {
            code,
            reason: "Test".to_string(),
            message: "test".to_string(),
        })
    }

    #[test]
    fn test_status_500_is_fatal() {
        assert_eq!(api(500).kind(), ErrorKind::FatalCluster);
        assert!(!api(500).is_recoverable());
    }

    #[test]
    fn test_other_api_statuses_restart() {
        for code in [401, 403, 404, 410, 502, 503] {
            assert_eq!(api(code).kind(), ErrorKind::TransientCluster, "code {}", code);
            assert!(api(code).is_recoverable());
        }
    }

    #[test]
    fn test_transport_errors_restart() {
        let err = SidecarError::Cluster(ClusterError::Transport("connection reset".into()));
        assert_eq!(err.kind().recovery(), Recovery::Restart);
    }

    #[test]
    fn test_uncategorized_client_errors_are_fatal() {
        let err = SidecarError::Cluster(ClusterError::Client("bad request body".into()));
        assert_eq!(err.kind().recovery(), Recovery::Fatal);
    }

    #[test]
    fn test_storage_and_config_errors_are_fatal() {
        let storage = SidecarError::Storage(StorageError::WriteFile {
            path: PathBuf::from("/out/a.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(storage.kind(), ErrorKind::Filesystem);
        assert!(!storage.is_recoverable());

        let config = SidecarError::Config(ConfigError::Missing("LABEL"));
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert!(!config.is_recoverable());
    }

    #[test]
    fn test_cluster_status_accessor() {
        assert_eq!(
            ClusterError::Api {
                code: 410,
                reason: "Gone".into(),
                message: "too old".into()
            }
            .status(),
            Some(410)
        );
        assert_eq!(ClusterError::Transport("eof".into()).status(), None);
    }
}
