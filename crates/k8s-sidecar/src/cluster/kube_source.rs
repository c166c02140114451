//! [`ResourceSource`] backed by the Kubernetes API.

use async_trait::async_trait;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::api::{Api, ListParams, WatchEvent, WatchParams};
use kube::{Client, Config};
use tracing::{debug, info, warn};

use super::{ResourceSource, WatchItem, WatchScope, WatchStream};
use crate::config::NamespaceSelector;
use crate::error::ClusterError;
use crate::resource::{Resource, ResourceEvent};

/// Cluster client built once at startup and shared by reference.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
    namespace: String,
}

impl KubeSource {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Infers in-cluster or kubeconfig settings and connects.
    pub async fn connect(skip_tls_verify: bool) -> Result<Self, ClusterError> {
        let mut config = Config::infer()
            .await
            .map_err(|e| ClusterError::Client(e.to_string()))?;

        if skip_tls_verify {
            warn!("TLS certificate verification for the cluster API is disabled");
            config.accept_invalid_certs = true;
        }

        let namespace = config.default_namespace.clone();
        let client = Client::try_from(config)?;
        info!("Config for cluster api loaded, own namespace is {}", namespace);

        Ok(Self::new(client, namespace))
    }

    fn config_maps(&self, scope: &WatchScope) -> Api<ConfigMap> {
        match scope {
            WatchScope::Namespace(ns) => Api::namespaced(self.client.clone(), ns),
            WatchScope::AllNamespaces => Api::all(self.client.clone()),
        }
    }
}

impl std::fmt::Debug for KubeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSource")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl ResourceSource for KubeSource {
    fn own_namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_namespaces(
        &self,
        selector: &NamespaceSelector,
    ) -> Result<Vec<String>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let lp = ListParams::default().labels(&selector.to_string());
        let namespaces = api.list(&lp).await?;

        Ok(namespaces
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list(&self, scope: &WatchScope, label: &str) -> Result<Vec<Resource>, ClusterError> {
        let lp = ListParams::default().labels(label);
        let config_maps = self.config_maps(scope).list(&lp).await?;
        debug!("Listed {} config maps in {}", config_maps.items.len(), scope);

        Ok(config_maps.items.into_iter().map(Resource::from).collect())
    }

    async fn watch(
        &self,
        scope: &WatchScope,
        label: &str,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError> {
        let wp = WatchParams::default().labels(label);
        let stream = self.config_maps(scope).watch(&wp, resource_version).await?;
        debug!("Opened watch on {} at version {}", scope, resource_version);

        Ok(stream.map(convert_watch_event).boxed())
    }
}

fn convert_watch_event(
    item: kube::Result<WatchEvent<ConfigMap>>,
) -> Result<WatchItem, ClusterError> {
    match item? {
        WatchEvent::Added(cm) => Ok(WatchItem::Event(ResourceEvent::Added(cm.into()))),
        WatchEvent::Modified(cm) => Ok(WatchItem::Event(ResourceEvent::Modified(cm.into()))),
        WatchEvent::Deleted(cm) => Ok(WatchItem::Event(ResourceEvent::Deleted(cm.into()))),
        WatchEvent::Bookmark(bookmark) => {
            Ok(WatchItem::Bookmark(bookmark.metadata.resource_version))
        }
        WatchEvent::Error(response) => Err(ClusterError::Api {
            code: response.code,
            reason: response.reason,
            message: response.message,
        }),
    }
}
