//! In-memory cluster for driving the sync engine.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use k8s_sidecar::{
    ClusterError, NamespaceSelector, Resource, ResourceSource, WatchItem, WatchScope,
    WatchStream,
};

type Script = Vec<Result<WatchItem, ClusterError>>;

/// One scripted watch connection.
struct ScriptedWatch {
    items: Script,
    /// Whether the server closes the stream after the last item.
    closes: bool,
}

/// A recorded call to `watch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCall {
    pub scope: WatchScope,
    pub resource_version: String,
}

/// Cluster double with fixed namespaces and resources.
///
/// Each `watch` call consumes the next script for its scope. With no script
/// left the stream stays open without yielding anything.
pub struct FakeSource {
    own_namespace: String,
    namespaces: Vec<(String, BTreeMap<String, String>)>,
    resources: Vec<Resource>,
    scripts: Mutex<HashMap<WatchScope, VecDeque<ScriptedWatch>>>,
    watch_calls: Mutex<Vec<WatchCall>>,
}

impl FakeSource {
    pub fn new(own_namespace: &str) -> Self {
        Self {
            own_namespace: own_namespace.to_string(),
            namespaces: Vec::new(),
            resources: Vec::new(),
            scripts: Mutex::new(HashMap::new()),
            watch_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_namespace(mut self, name: &str, labels: &[(&str, &str)]) -> Self {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.namespaces.push((name.to_string(), labels));
        self
    }

    /// Adds a resource returned by `list`. Label filtering is left to the caller.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Queues a watch connection that stays open after its items.
    pub fn with_watch(self, scope: WatchScope, items: Script) -> Self {
        self.push(scope, items, false);
        self
    }

    /// Queues a watch connection the server closes after its items.
    pub fn with_closing_watch(self, scope: WatchScope, items: Script) -> Self {
        self.push(scope, items, true);
        self
    }

    pub fn watch_calls(&self) -> Vec<WatchCall> {
        self.watch_calls.lock().unwrap().clone()
    }

    fn push(&self, scope: WatchScope, items: Script, closes: bool) {
        self.scripts
            .lock()
            .unwrap()
            .entry(scope)
            .or_default()
            .push_back(ScriptedWatch { items, closes });
    }
}

#[async_trait]
impl ResourceSource for FakeSource {
    fn own_namespace(&self) -> &str {
        &self.own_namespace
    }

    async fn list_namespaces(
        &self,
        selector: &NamespaceSelector,
    ) -> Result<Vec<String>, ClusterError> {
        Ok(self
            .namespaces
            .iter()
            .filter(|(_, labels)| selector.matches(labels))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list(&self, scope: &WatchScope, _label: &str) -> Result<Vec<Resource>, ClusterError> {
        Ok(self
            .resources
            .iter()
            .filter(|r| match scope {
                WatchScope::Namespace(ns) => &r.namespace == ns,
                WatchScope::AllNamespaces => true,
            })
            .cloned()
            .collect())
    }

    async fn watch(
        &self,
        scope: &WatchScope,
        _label: &str,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError> {
        self.watch_calls.lock().unwrap().push(WatchCall {
            scope: scope.clone(),
            resource_version: resource_version.to_string(),
        });

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(scope)
            .and_then(|queue| queue.pop_front());

        Ok(match next {
            Some(ScriptedWatch {
                items,
                closes: true,
            }) => stream::iter(items).boxed(),
            Some(ScriptedWatch {
                items,
                closes: false,
            }) => stream::iter(items).chain(stream::pending()).boxed(),
            None => stream::pending().boxed(),
        })
    }
}
