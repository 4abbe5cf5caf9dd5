//! Rules: single predicates over an enriched event
//!
//! Every pattern is a regular expression searched (unanchored) in the
//! corresponding event field. Unset patterns match anything, so an empty
//! rule matches every event.

use crate::error::{ExporterError, Result};
use crate::types::EnhancedEvent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A compiled regular expression loaded from configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| ExporterError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Pattern {
    type Error = ExporterError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A predicate over an event, optionally bound to a receiver
///
/// Rules are immutable once loaded. A rule without a receiver only gates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Label key → value pattern; every key must be present on the object
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, Pattern>,

    /// Annotation key → value pattern; every key must be present on the object
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Pattern>,

    /// Matched against the involved object's API version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<Pattern>,

    /// Matched against the involved object's kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Pattern>,

    /// Matched against the namespace of the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Pattern>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<Pattern>,

    /// Minimum occurrence count; zero disables the check
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_count: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

fn field_matches(pattern: &Option<Pattern>, value: &str) -> bool {
    pattern.as_ref().map_or(true, |p| p.is_match(value))
}

fn map_matches(
    patterns: &HashMap<String, Pattern>,
    values: Option<&HashMap<String, String>>,
) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let Some(values) = values else {
        return false;
    };
    patterns
        .iter()
        .all(|(key, pattern)| values.get(key).is_some_and(|v| pattern.is_match(v)))
}

impl Rule {
    /// Rule that dispatches to `receiver` for every event
    pub fn for_receiver(receiver: impl Into<String>) -> Self {
        Self {
            receiver: Some(receiver.into()),
            ..Default::default()
        }
    }

    /// Receiver this rule dispatches to, if any
    ///
    /// An empty name counts as no receiver.
    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref().filter(|name| !name.is_empty())
    }

    /// Evaluate the rule against an event
    pub fn matches_event(&self, ev: &EnhancedEvent) -> bool {
        let event = &ev.event;
        let object = &ev.involved_object;

        field_matches(&self.api_version, &object.reference.api_version)
            && field_matches(&self.kind, &object.reference.kind)
            && field_matches(&self.namespace, event.namespace())
            && field_matches(&self.message, &event.message)
            && field_matches(&self.reason, &event.reason)
            && field_matches(&self.component, &event.source.component)
            && field_matches(&self.host, &event.source.host)
            && field_matches(&self.event_type, &event.event_type)
            && map_matches(&self.labels, object.labels.as_ref())
            && map_matches(&self.annotations, object.annotations.as_ref())
            && (self.min_count <= 0 || event.count >= self.min_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, EventMeta, ObjectReference};

    fn event(reason: &str, namespace: &str) -> EnhancedEvent {
        EnhancedEvent::new(&Event {
            metadata: EventMeta {
                namespace: namespace.to_string(),
                ..Default::default()
            },
            reason: reason.to_string(),
            event_type: "Warning".to_string(),
            count: 2,
            involved_object: ObjectReference {
                kind: "Pod".to_string(),
                name: "api-0".to_string(),
                api_version: "v1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn pattern(p: &str) -> Option<Pattern> {
        Some(Pattern::new(p).unwrap())
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        assert!(Rule::default().matches_event(&event("Failed", "prod")));
    }

    #[test]
    fn test_patterns_are_unanchored() {
        let rule = Rule {
            reason: pattern("Failed"),
            ..Default::default()
        };
        assert!(rule.matches_event(&event("FailedMount", "prod")));
        assert!(!rule.matches_event(&event("Pulled", "prod")));

        let anchored = Rule {
            reason: pattern("^Failed$"),
            ..Default::default()
        };
        assert!(!anchored.matches_event(&event("FailedMount", "prod")));
    }

    #[test]
    fn test_all_fields_must_match() {
        let rule = Rule {
            reason: pattern("Failed"),
            namespace: pattern("prod"),
            kind: pattern("Pod"),
            ..Default::default()
        };
        assert!(rule.matches_event(&event("Failed", "prod")));
        assert!(!rule.matches_event(&event("Failed", "dev")));
    }

    #[test]
    fn test_min_count() {
        let rule = Rule {
            min_count: 3,
            ..Default::default()
        };
        assert!(!rule.matches_event(&event("Failed", "prod")));

        let rule = Rule {
            min_count: 2,
            ..Default::default()
        };
        assert!(rule.matches_event(&event("Failed", "prod")));
    }

    #[test]
    fn test_labels_require_enrichment() {
        let mut labels = HashMap::new();
        labels.insert("team".to_string(), Pattern::new("^payments$").unwrap());
        let rule = Rule {
            labels,
            ..Default::default()
        };

        let bare = event("Failed", "prod");
        assert!(!rule.matches_event(&bare));

        let mut resolved = HashMap::new();
        resolved.insert("team".to_string(), "payments".to_string());
        assert!(rule.matches_event(&bare.clone().with_labels(resolved)));

        let mut other = HashMap::new();
        other.insert("team".to_string(), "search".to_string());
        assert!(!rule.matches_event(&bare.with_labels(other)));
    }

    #[test]
    fn test_empty_receiver_is_no_receiver() {
        let rule = Rule {
            receiver: Some(String::new()),
            ..Default::default()
        };
        assert!(rule.receiver().is_none());
        assert_eq!(Rule::for_receiver("slack").receiver(), Some("slack"));
    }

    #[test]
    fn test_deserialize_compiles_patterns() {
        let yaml = "reason: Failed\ntype: Warning\nminCount: 2\nlabels:\n  app: web\nreceiver: dump\n";
        let rule: Rule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.reason.as_ref().map(Pattern::as_str), Some("Failed"));
        assert_eq!(rule.min_count, 2);
        assert_eq!(rule.receiver(), Some("dump"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = serde_yaml::from_str::<Rule>("reason: \"(unclosed\"\n").unwrap_err();
        assert!(err.to_string().contains("Invalid pattern"));
    }
}
