pub mod cluster;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod resource;
pub mod storage;
pub mod sync;
pub mod telemetry;

pub use cluster::{KubeSource, ResourceSource, WatchItem, WatchScope, WatchStream};
pub use config::{LogConfig, LogFormat, NamespaceSelector, SidecarConfig, SyncMethod};
pub use content::{ContentResolver, ResolvedFile};
pub use error::{
    ClusterError, ConfigError, ErrorKind, HttpError, Recovery, Result, SidecarError,
    StorageError, TelemetryError,
};
pub use http::{HttpClient, Notifier};
pub use resource::{EventType, Resource, ResourceEvent, ResourceKey};
pub use storage::{FileStorage, Removal};
pub use sync::{AddressingMode, EventReconciler, ReconcileOutcome, Supervisor, SyncSummary};
pub use telemetry::init_tracing;
