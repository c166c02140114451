pub mod selector;
pub mod settings;

pub use selector::NamespaceSelector;
pub use settings::{
    LogConfig, LogFormat, RequestConfig, RequestMethod, RetryPolicy, SidecarConfig, SyncMethod,
    ALL_NAMESPACES, DEFAULT_FOLDER_ANNOTATION, DEFAULT_REMOTE_FETCH_SUFFIX,
};
