//! Shared test utilities for k8s-sidecar integration tests.
//!
//! This module provides:
//! - `FakeSource`, an in-memory cluster with scripted watch streams
//! - `TestHarness` for an isolated output directory and config

#![allow(dead_code)]

pub mod fake_source;
pub mod harness;

pub use fake_source::FakeSource;
pub use harness::TestHarness;

use k8s_sidecar::{ClusterError, Resource, ResourceEvent, WatchItem};

/// Label every test resource is selected by.
pub const LABEL: &str = "grafana_dashboard";

/// A labeled resource with one data entry.
pub fn labeled(namespace: &str, name: &str, key: &str, value: &str) -> Resource {
    Resource::new(namespace, name)
        .with_label(LABEL, "1")
        .with_data(key, value)
}

pub fn added(resource: Resource) -> Result<WatchItem, ClusterError> {
    Ok(WatchItem::Event(ResourceEvent::Added(resource)))
}

pub fn modified(resource: Resource) -> Result<WatchItem, ClusterError> {
    Ok(WatchItem::Event(ResourceEvent::Modified(resource)))
}

pub fn deleted(resource: Resource) -> Result<WatchItem, ClusterError> {
    Ok(WatchItem::Event(ResourceEvent::Deleted(resource)))
}

pub fn bookmark(version: &str) -> Result<WatchItem, ClusterError> {
    Ok(WatchItem::Bookmark(version.to_string()))
}

pub fn api_error(code: u16) -> Result<WatchItem, ClusterError> {
    Err(ClusterError::Api {
        code,
        reason: "Scripted".to_string(),
        message: format!("scripted failure {}", code),
    })
}
