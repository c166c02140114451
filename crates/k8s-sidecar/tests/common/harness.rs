//! Isolated output directory and config for engine tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use k8s_sidecar::config::RetryPolicy;
use k8s_sidecar::{SidecarConfig, Supervisor};

use super::{FakeSource, LABEL};

/// Retry policy that fails fast and never sleeps.
pub fn fast_retry(total: u32) -> RetryPolicy {
    RetryPolicy {
        total,
        connect: total,
        read: total,
        backoff_factor: 0.0,
        timeout: Duration::from_secs(5),
    }
}

pub struct TestHarness {
    /// Keeps the directory alive for the duration of the test.
    _temp_dir: TempDir,
    /// Default destination folder.
    pub output_dir: PathBuf,
    pub config: SidecarConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("out");
        let mut config = SidecarConfig::new(LABEL, output_dir.clone());
        config.retry = fast_retry(0);

        Self {
            _temp_dir: temp_dir,
            output_dir,
            config,
        }
    }

    /// Builds a supervisor over `source` that restarts without delay.
    pub fn supervisor(&self, source: Arc<FakeSource>) -> Supervisor<FakeSource> {
        Supervisor::new(&self.config, source)
            .expect("Failed to build supervisor")
            .with_restart_delay(Duration::ZERO)
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    pub fn read(&self, filename: &str) -> String {
        read_file(&self.path(filename))
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path(filename).exists()
    }
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}
