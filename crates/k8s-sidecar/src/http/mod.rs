pub mod client;
pub mod notifier;

pub use client::{HttpClient, RETRY_STATUSES};
pub use notifier::Notifier;
