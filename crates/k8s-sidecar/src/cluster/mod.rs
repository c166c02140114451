//! Access to the cluster API.
//!
//! The sync engine only needs three capabilities: list the namespaces matching
//! a selector, list the resources in a scope, and stream changes for a scope.
//! [`ResourceSource`] captures them so the engine can run against the real
//! API ([`KubeSource`]) or an in-memory source in tests.

pub mod kube_source;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::config::NamespaceSelector;
use crate::error::ClusterError;
use crate::resource::{Resource, ResourceEvent};

pub use kube_source::KubeSource;

/// Resource version that makes the server replay current state as `Added`.
pub const INITIAL_RESOURCE_VERSION: &str = "0";

/// Where resources are listed and watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchScope {
    Namespace(String),
    AllNamespaces,
}

impl fmt::Display for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchScope::Namespace(ns) => write!(f, "namespace {}", ns),
            WatchScope::AllNamespaces => write!(f, "all namespaces"),
        }
    }
}

/// One item of a watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchItem {
    Event(ResourceEvent),
    /// Progress marker carrying only a resource version.
    Bookmark(String),
}

pub type WatchStream = BoxStream<'static, Result<WatchItem, ClusterError>>;

#[async_trait]
pub trait ResourceSource: Send + Sync + 'static {
    /// Namespace the sidecar itself runs in.
    fn own_namespace(&self) -> &str;

    async fn list_namespaces(
        &self,
        selector: &NamespaceSelector,
    ) -> Result<Vec<String>, ClusterError>;

    /// Lists resources carrying `label` in `scope`.
    async fn list(&self, scope: &WatchScope, label: &str) -> Result<Vec<Resource>, ClusterError>;

    /// Streams changes to resources carrying `label` in `scope`, starting
    /// after `resource_version`.
    async fn watch(
        &self,
        scope: &WatchScope,
        label: &str,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError>;
}
