//! Applies resource events to the filesystem.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info, info_span, Instrument};

use super::index::{MaterializedFile, MaterializedIndex};
use crate::config::SidecarConfig;
use crate::content::ContentResolver;
use crate::error::{Result, SidecarError};
use crate::http::{HttpClient, Notifier};
use crate::resource::{Resource, ResourceEvent};
use crate::storage::FileStorage;

/// What a single event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The resource does not carry the target label.
    Ignored,
    /// Labeled, but there was nothing to write or remove.
    Empty,
    Materialized { files: usize },
    Removed { files: usize },
}

/// Turns resource snapshots into file writes, removals and notifications.
///
/// There is no rollback: if a key fails midway, the keys before it stay
/// materialized and the next replay repairs the rest.
pub struct EventReconciler {
    label: String,
    default_folder: PathBuf,
    folder_annotation: String,
    resolver: ContentResolver,
    storage: FileStorage,
    notifier: Notifier,
    index: MaterializedIndex,
}

impl EventReconciler {
    pub fn new(config: &SidecarConfig, client: HttpClient) -> Self {
        Self {
            label: config.label.clone(),
            default_folder: config.folder.clone(),
            folder_annotation: config.folder_annotation.clone(),
            resolver: ContentResolver::new(client.clone(), config.remote_fetch_suffix.clone()),
            storage: FileStorage::new(),
            notifier: Notifier::new(client, config.request.clone()),
            index: MaterializedIndex::new(),
        }
    }

    pub fn index(&self) -> &MaterializedIndex {
        &self.index
    }

    /// Destination for a resource: the override annotation if present,
    /// otherwise the default folder.
    pub fn destination_folder(&self, resource: &Resource) -> PathBuf {
        match resource.annotations.get(&self.folder_annotation) {
            Some(folder) => PathBuf::from(folder),
            None => self.default_folder.clone(),
        }
    }

    pub async fn apply(&mut self, event: &ResourceEvent) -> Result<ReconcileOutcome> {
        let resource = event.resource();
        let span = info_span!(
            "reconcile",
            resource = %resource.key(),
            event = %event.event_type()
        );
        self.apply_inner(event).instrument(span).await
    }

    async fn apply_inner(&mut self, event: &ResourceEvent) -> Result<ReconcileOutcome> {
        let resource = event.resource();
        info!("Working on configmap {}", resource.key());

        if !resource.has_label(&self.label) {
            debug!("Configmap without label '{}', skipping", self.label);
            // A label removal arrives as a delete without the label. Files stay.
            if let ResourceEvent::Deleted(_) = event {
                self.index.take(&resource.key());
            }
            return Ok(ReconcileOutcome::Ignored);
        }
        debug!("Configmap with label found");

        let folder = self.destination_folder(resource);
        if resource.annotations.contains_key(&self.folder_annotation) {
            info!(
                "Found a folder override annotation, placing the configmap in: {}",
                folder.display()
            );
        }

        match event {
            ResourceEvent::Added(_) | ResourceEvent::Modified(_) => {
                self.materialize(resource, folder).await
            }
            ResourceEvent::Deleted(_) => self.remove(resource, folder).await,
        }
    }

    async fn materialize(
        &mut self,
        resource: &Resource,
        folder: PathBuf,
    ) -> Result<ReconcileOutcome> {
        if resource.data.is_empty() {
            info!("Configmap does not have data.");
            return Ok(ReconcileOutcome::Empty);
        }

        let key = resource.key();
        for (data_key, value) in &resource.data {
            debug!("File in configmap {} to write", data_key);
            let file = self.resolver.resolve(data_key, value).await?;
            self.storage
                .write(&folder, &file.filename, file.content.as_bytes())?;
            self.index
                .record(&key, MaterializedFile::new(folder.clone(), file.filename));
            self.notify().await?;
        }

        Ok(ReconcileOutcome::Materialized {
            files: resource.data.len(),
        })
    }

    async fn remove(&mut self, resource: &Resource, folder: PathBuf) -> Result<ReconcileOutcome> {
        let mut targets: BTreeSet<MaterializedFile> = self.index.take(&resource.key());
        for data_key in resource.data.keys() {
            let filename = self.resolver.filename_for(data_key);
            targets.insert(MaterializedFile::new(folder.clone(), filename));
        }

        if targets.is_empty() {
            info!("Configmap does not have data.");
            return Ok(ReconcileOutcome::Empty);
        }

        for target in &targets {
            debug!("Removing {}", target.path().display());
            self.storage.remove(&target.folder, &target.filename)?;
            self.notify().await?;
        }

        Ok(ReconcileOutcome::Removed {
            files: targets.len(),
        })
    }

    async fn notify(&self) -> Result<()> {
        self.notifier
            .notify()
            .await
            .map_err(SidecarError::Notification)?;
        Ok(())
    }
}
