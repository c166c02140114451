//! The resilience loop around the watch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::multiplexer::{AddressingMode, Multiplexer};
use super::reconciler::{EventReconciler, ReconcileOutcome};
use crate::cluster::ResourceSource;
use crate::config::{SidecarConfig, SyncMethod};
use crate::error::{Recovery, Result, SidecarError};
use crate::http::HttpClient;
use crate::resource::ResourceEvent;

/// Pause between a recoverable failure and the next watch attempt.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Result of a one-shot list pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Resources returned by the list call.
    pub resources: usize,
    /// Files written across all resources.
    pub files: usize,
}

/// Drives the multiplexer and reconciler, restarting the watch on
/// recoverable failures.
pub struct Supervisor<S> {
    multiplexer: Multiplexer<S>,
    reconciler: EventReconciler,
    restart_delay: Duration,
    restarts: u64,
}

impl<S: ResourceSource> Supervisor<S> {
    pub fn new(config: &SidecarConfig, source: Arc<S>) -> Result<Self> {
        let mode = AddressingMode::resolve(config, source.own_namespace());
        let client = HttpClient::new(config.retry.clone()).map_err(SidecarError::HttpClient)?;

        Ok(Self {
            multiplexer: Multiplexer::new(source, mode, config.label.clone()),
            reconciler: EventReconciler::new(config, client),
            restart_delay: RESTART_DELAY,
            restarts: 0,
        })
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Number of times the watch has been restarted.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Runs a single list pass or the supervised watch.
    pub async fn start(&mut self, method: SyncMethod) -> Result<()> {
        match method {
            SyncMethod::List => {
                let summary = self.sync_once().await?;
                info!(
                    "List sync complete: {} resource(s), {} file(s) written",
                    summary.resources, summary.files
                );
                Ok(())
            }
            SyncMethod::Watch => self.run().await,
        }
    }

    /// Lists every resource once and reconciles each as if it were added.
    pub async fn sync_once(&mut self) -> Result<SyncSummary> {
        let resources = self.multiplexer.list().await?;
        let mut summary = SyncSummary {
            resources: resources.len(),
            files: 0,
        };

        for resource in resources {
            if let ReconcileOutcome::Materialized { files } = self
                .reconciler
                .apply(&ResourceEvent::Added(resource))
                .await?
            {
                summary.files += files;
            }
        }

        Ok(summary)
    }

    /// Watches forever. Only returns when a failure is fatal.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let err = match self.watch().await {
                Ok(()) => {
                    info!("Event feed ended, restarting watch");
                    self.restarts += 1;
                    continue;
                }
                Err(err) => err,
            };

            match err.kind().recovery() {
                Recovery::Restart => {
                    warn!("Recoverable error while watching ({:?}): {}", err.kind(), err);
                    self.restarts += 1;
                    tokio::time::sleep(self.restart_delay).await;
                }
                Recovery::Fatal => {
                    error!("Fatal error while watching ({:?}): {}", err.kind(), err);
                    return Err(err);
                }
            }
        }
    }

    /// One watch session: open the feed and reconcile until it fails.
    async fn watch(&mut self) -> Result<()> {
        let mut feed = self.multiplexer.open().await?;
        info!(
            "Watching ({:?}) with {} worker(s)",
            self.multiplexer.mode(),
            feed.worker_count()
        );

        while let Some(event) = feed.next().await {
            self.reconciler.apply(&event?).await?;
        }

        Ok(())
    }
}
