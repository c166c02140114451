//! Watch/reconcile engine.
//!
//! - [`Multiplexer`] merges watch streams for the configured namespaces
//! - [`EventReconciler`] applies each event to the filesystem
//! - [`Supervisor`] restarts the watch on recoverable failures

pub mod index;
pub mod multiplexer;
pub mod reconciler;
pub mod supervisor;

pub use index::{MaterializedFile, MaterializedIndex};
pub use multiplexer::{AddressingMode, EventFeed, Multiplexer};
pub use reconciler::{EventReconciler, ReconcileOutcome};
pub use supervisor::{Supervisor, SyncSummary, RESTART_DELAY};
