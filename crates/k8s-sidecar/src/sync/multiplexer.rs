//! Merges one or more watch streams into a single event feed.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cluster::{ResourceSource, WatchItem, WatchScope, INITIAL_RESOURCE_VERSION};
use crate::config::{NamespaceSelector, SidecarConfig, ALL_NAMESPACES};
use crate::error::{ClusterError, Result, SidecarError};
use crate::resource::{Resource, ResourceEvent};

/// How namespaces are addressed, decided once per start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    Single(String),
    All,
    FanOut(NamespaceSelector),
}

impl AddressingMode {
    /// Explicit namespace, then `ALL`, then the namespace selector, then
    /// the sidecar's own namespace.
    pub fn resolve(config: &SidecarConfig, own_namespace: &str) -> Self {
        match (&config.namespace, &config.namespace_selector) {
            (Some(ns), _) if ns != ALL_NAMESPACES => AddressingMode::Single(ns.clone()),
            (Some(_), _) => AddressingMode::All,
            (None, Some(selector)) => AddressingMode::FanOut(selector.clone()),
            (None, None) => AddressingMode::Single(own_namespace.to_string()),
        }
    }
}

/// Message sent by a watch worker.
#[derive(Debug)]
enum FeedMessage {
    Event(ResourceEvent),
    WorkerFailed {
        scope: WatchScope,
        error: ClusterError,
    },
}

/// Merged events from all watch workers.
///
/// Events from one scope arrive in the order the API delivered them; events
/// from different scopes interleave arbitrarily. Dropping the feed stops all
/// workers.
pub struct EventFeed {
    receiver: UnboundedReceiver<FeedMessage>,
    // Keeps the channel open while no worker is running, e.g. when the
    // namespace selector matched nothing.
    _sender: UnboundedSender<FeedMessage>,
    workers: JoinSet<()>,
}

impl EventFeed {
    /// Number of watch workers started.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Waits for the next event. A failed worker surfaces as an error.
    pub async fn next(&mut self) -> Option<Result<ResourceEvent>> {
        match self.receiver.recv().await? {
            FeedMessage::Event(event) => Some(Ok(event)),
            FeedMessage::WorkerFailed { scope, error } => {
                warn!("Watch on {} failed: {}", scope, error);
                Some(Err(SidecarError::Cluster(error)))
            }
        }
    }
}

/// Opens watches for the configured addressing mode.
pub struct Multiplexer<S> {
    source: Arc<S>,
    mode: AddressingMode,
    label: String,
}

impl<S: ResourceSource> Multiplexer<S> {
    pub fn new(source: Arc<S>, mode: AddressingMode, label: impl Into<String>) -> Self {
        Self {
            source,
            mode,
            label: label.into(),
        }
    }

    pub fn mode(&self) -> &AddressingMode {
        &self.mode
    }

    /// The scopes to list or watch. Fan-out lists matching namespaces now.
    pub async fn scopes(&self) -> Result<Vec<WatchScope>> {
        match &self.mode {
            AddressingMode::Single(ns) => Ok(vec![WatchScope::Namespace(ns.clone())]),
            AddressingMode::All => Ok(vec![WatchScope::AllNamespaces]),
            AddressingMode::FanOut(selector) => {
                let namespaces = self.source.list_namespaces(selector).await?;
                info!(
                    "Namespace selector '{}' matched {} namespace(s): {:?}",
                    selector,
                    namespaces.len(),
                    namespaces
                );
                Ok(namespaces.into_iter().map(WatchScope::Namespace).collect())
            }
        }
    }

    /// Lists every labeled resource in all scopes.
    pub async fn list(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for scope in self.scopes().await? {
            resources.extend(self.source.list(&scope, &self.label).await?);
        }
        Ok(resources)
    }

    /// Starts one watch worker per scope and returns the merged feed.
    pub async fn open(&self) -> Result<EventFeed> {
        let scopes = self.scopes().await?;
        if scopes.is_empty() {
            warn!("No namespaces to watch; waiting until the watch is restarted");
        }

        let (sender, receiver) = unbounded_channel();
        let mut workers = JoinSet::new();
        for scope in scopes {
            info!("Starting watch on {}", scope);
            workers.spawn(pump(
                Arc::clone(&self.source),
                scope,
                self.label.clone(),
                sender.clone(),
            ));
        }

        Ok(EventFeed {
            receiver,
            _sender: sender,
            workers,
        })
    }
}

/// Forwards one scope's watch into the shared channel.
///
/// Starts from the initial version so current state is replayed, resumes from
/// the last seen version when the server closes the stream, and reports the
/// first error back through the channel before exiting.
async fn pump<S: ResourceSource>(
    source: Arc<S>,
    scope: WatchScope,
    label: String,
    sender: UnboundedSender<FeedMessage>,
) {
    let mut resource_version = INITIAL_RESOURCE_VERSION.to_string();

    loop {
        let mut stream = match source.watch(&scope, &label, &resource_version).await {
            Ok(stream) => stream,
            Err(error) => {
                let _ = sender.send(FeedMessage::WorkerFailed { scope, error });
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(WatchItem::Event(event)) => {
                    if let Some(version) = &event.resource().resource_version {
                        resource_version = version.clone();
                    }
                    if sender.send(FeedMessage::Event(event)).is_err() {
                        return;
                    }
                }
                Ok(WatchItem::Bookmark(version)) => resource_version = version,
                Err(error) => {
                    let _ = sender.send(FeedMessage::WorkerFailed { scope, error });
                    return;
                }
            }
        }

        debug!(
            "Watch on {} closed by server, resuming at version {}",
            scope, resource_version
        );
    }
}
