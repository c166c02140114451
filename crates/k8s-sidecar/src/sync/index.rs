//! Record of which files each resource has produced.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::resource::ResourceKey;

/// A file written on behalf of a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterializedFile {
    pub folder: PathBuf,
    pub filename: String,
}

impl MaterializedFile {
    pub fn new(folder: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }
}

/// Files materialized per resource since startup.
///
/// Entries accumulate across Added/Modified events, so a delete also cleans up
/// files produced under an earlier folder override or by a data key that has
/// since been dropped. An entry is also dropped, without touching its files,
/// when the resource is deleted after losing its label. The index lives in
/// memory only; after a restart it is rebuilt from the replayed state.
#[derive(Debug, Default)]
pub struct MaterializedIndex {
    entries: HashMap<ResourceKey, BTreeSet<MaterializedFile>>,
}

impl MaterializedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &ResourceKey, file: MaterializedFile) {
        self.entries.entry(key.clone()).or_default().insert(file);
    }

    pub fn files(&self, key: &ResourceKey) -> Option<&BTreeSet<MaterializedFile>> {
        self.entries.get(key)
    }

    /// Removes and returns everything recorded for `key`.
    pub fn take(&mut self, key: &ResourceKey) -> BTreeSet<MaterializedFile> {
        self.entries.remove(key).unwrap_or_default()
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
