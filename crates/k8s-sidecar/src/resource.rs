//! Cluster-agnostic view of the ConfigMaps being mirrored.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::ConfigMap;
use serde::{Deserialize, Serialize};

/// Identity of a resource within the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A snapshot of a configuration resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub namespace: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Filename key to file content.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,

    /// Only used to resume a watch after the server closes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl Resource {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }
}

impl From<ConfigMap> for Resource {
    fn from(cm: ConfigMap) -> Self {
        let metadata = cm.metadata;
        Self {
            namespace: metadata.namespace.unwrap_or_default(),
            name: metadata.name.unwrap_or_default(),
            labels: metadata.labels.unwrap_or_default(),
            annotations: metadata.annotations.unwrap_or_default(),
            data: cm.data.unwrap_or_default(),
            resource_version: metadata.resource_version,
        }
    }
}

/// The kind of change a watch event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Added => write!(f, "ADDED"),
            EventType::Modified => write!(f, "MODIFIED"),
            EventType::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A resource snapshot as observed at event time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum ResourceEvent {
    Added(Resource),
    Modified(Resource),
    Deleted(Resource),
}

impl ResourceEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ResourceEvent::Added(_) => EventType::Added,
            ResourceEvent::Modified(_) => EventType::Modified,
            ResourceEvent::Deleted(_) => EventType::Deleted,
        }
    }

    pub fn resource(&self) -> &Resource {
        match self {
            ResourceEvent::Added(r) | ResourceEvent::Modified(r) | ResourceEvent::Deleted(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_from_config_map() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("dashboards".to_string()),
                namespace: Some("monitoring".to_string()),
                labels: Some(BTreeMap::from([(
                    "grafana_dashboard".to_string(),
                    "1".to_string(),
                )])),
                resource_version: Some("4711".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "overview.json".to_string(),
                "{}".to_string(),
            )])),
            ..Default::default()
        };

        let resource = Resource::from(cm);
        assert_eq!(resource.key().to_string(), "monitoring/dashboards");
        assert!(resource.has_label("grafana_dashboard"));
        assert!(resource.annotations.is_empty());
        assert_eq!(resource.data.get("overview.json").map(String::as_str), Some("{}"));
        assert_eq!(resource.resource_version.as_deref(), Some("4711"));
    }

    #[test]
    fn test_from_config_map_without_data() {
        let resource = Resource::from(ConfigMap::default());
        assert!(resource.labels.is_empty());
        assert!(resource.data.is_empty());
        assert!(resource.resource_version.is_none());
    }

    #[test]
    fn test_event_accessors() {
        let resource = Resource::new("ns", "r1").with_label("dashboard", "1");
        let event = ResourceEvent::Deleted(resource.clone());
        assert_eq!(event.event_type(), EventType::Deleted);
        assert_eq!(event.resource(), &resource);
    }

    #[test]
    fn test_event_serialization() {
        let event = ResourceEvent::Added(Resource::new("ns", "r1").with_data("a.json", "{}"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ADDED");
        assert_eq!(json["object"]["name"], "r1");
        assert_eq!(json["object"]["data"]["a.json"], "{}");
    }
}
