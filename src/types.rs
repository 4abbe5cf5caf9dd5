//! Core event types for the a3s-event-exporter pipeline
//!
//! All types use camelCase JSON serialization so that upstream cluster
//! notifications decode without translation.

use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Identity of the event object itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

/// Component that reported an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReporter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
}

/// Reference to the object an event is about
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_path: String,
}

impl ObjectReference {
    /// Cache key for the referenced object
    ///
    /// The UID when known, `kind/namespace/name` otherwise.
    pub fn cache_key(&self) -> String {
        if self.uid.is_empty() {
            format!("{}/{}/{}", self.kind, self.namespace, self.name)
        } else {
            self.uid.clone()
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// A raw lifecycle notification as delivered by the upstream source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub metadata: EventMeta,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub reason: String,

    /// Event type (e.g., "Normal", "Warning")
    #[serde(default, rename = "type")]
    pub event_type: String,

    /// How many times this event has occurred
    #[serde(default)]
    pub count: i32,

    #[serde(default)]
    pub source: EventReporter,

    #[serde(default)]
    pub involved_object: ObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Namespace the event was recorded in
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Last time this event was observed
    ///
    /// Falls back to `eventTime` for sources that only populate the newer field.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp.or(self.event_time)
    }
}

/// The involved object of an [`EnhancedEvent`] plus its resolved metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedObjectReference {
    #[serde(flatten)]
    pub reference: ObjectReference,

    /// Labels of the object, set only when the lookup succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,

    /// Annotations of the object, set only when the lookup succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

/// An event together with the enriched identity of its involved object
///
/// Owns a private copy of the notification so nothing the upstream source
/// does afterwards can be observed by enrichment or delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedEvent {
    pub event: Event,
    pub involved_object: EnhancedObjectReference,
}

impl EnhancedEvent {
    /// Build an envelope from a copy of the notification
    pub fn new(event: &Event) -> Self {
        Self {
            involved_object: EnhancedObjectReference {
                reference: event.involved_object.clone(),
                labels: None,
                annotations: None,
            },
            event: event.clone(),
        }
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.involved_object.labels = Some(labels);
        self
    }

    pub fn with_annotations(mut self, annotations: HashMap<String, String>) -> Self {
        self.involved_object.annotations = Some(annotations);
        self
    }
}

impl Serialize for EnhancedEvent {
    /// Serializes as the plain event whose `involvedObject` also carries
    /// the resolved labels and annotations.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.event).map_err(S::Error::custom)?;
        let involved = serde_json::to_value(&self.involved_object).map_err(S::Error::custom)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("involvedObject".to_string(), involved);
        }
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            metadata: EventMeta {
                name: "web-1.17a".to_string(),
                namespace: "prod".to_string(),
                ..Default::default()
            },
            message: "Back-off restarting failed container".to_string(),
            reason: "BackOff".to_string(),
            event_type: "Warning".to_string(),
            count: 3,
            involved_object: ObjectReference {
                kind: "Pod".to_string(),
                namespace: "prod".to_string(),
                name: "web-1".to_string(),
                uid: "uid-web-1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_event_deserialize_upstream_shape() {
        let json = r#"{
            "metadata": {"name": "web-1.17a", "namespace": "prod", "uid": "e-1"},
            "message": "Pulling image",
            "reason": "Pulling",
            "type": "Normal",
            "count": 1,
            "source": {"component": "kubelet", "host": "node-a"},
            "involvedObject": {"kind": "Pod", "namespace": "prod", "name": "web-1", "apiVersion": "v1"},
            "lastTimestamp": "2024-05-01T10:00:00Z"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.namespace(), "prod");
        assert_eq!(event.event_type, "Normal");
        assert_eq!(event.source.host, "node-a");
        assert_eq!(event.involved_object.api_version, "v1");
        assert!(event.last_timestamp.is_some());
        assert!(event.event_time.is_none());
    }

    #[test]
    fn test_last_seen_falls_back_to_event_time() {
        let mut event = sample_event();
        assert!(event.last_seen().is_none());

        let now = Utc::now();
        event.event_time = Some(now);
        assert_eq!(event.last_seen(), Some(now));

        let earlier = now - chrono::Duration::seconds(30);
        event.last_timestamp = Some(earlier);
        assert_eq!(event.last_seen(), Some(earlier));
    }

    #[test]
    fn test_enhanced_event_is_a_copy() {
        let mut event = sample_event();
        let enhanced = EnhancedEvent::new(&event);

        event.reason = "Mutated".to_string();
        event.involved_object.name = "other".to_string();

        assert_eq!(enhanced.event.reason, "BackOff");
        assert_eq!(enhanced.involved_object.reference.name, "web-1");
    }

    #[test]
    fn test_enhanced_event_serialization_merges_metadata() {
        let mut labels = HashMap::new();
        labels.insert("app".to_string(), "web".to_string());
        let enhanced = EnhancedEvent::new(&sample_event()).with_labels(labels);

        let value = serde_json::to_value(&enhanced).unwrap();
        assert_eq!(value["reason"], "BackOff");
        assert_eq!(value["involvedObject"]["name"], "web-1");
        assert_eq!(value["involvedObject"]["labels"]["app"], "web");
        assert!(value["involvedObject"].get("annotations").is_none());
    }

    #[test]
    fn test_cache_key() {
        let mut reference = sample_event().involved_object;
        assert_eq!(reference.cache_key(), "uid-web-1");

        reference.uid.clear();
        assert_eq!(reference.cache_key(), "Pod/prod/web-1");
        assert_eq!(reference.to_string(), "Pod/prod/web-1");
    }
}
