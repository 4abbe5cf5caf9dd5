//! kubectl-backed object fetcher
//!
//! Resolves involved objects by running `kubectl get ... -o json`, so the
//! exporter inherits whatever cluster access the local kubeconfig grants.

use super::{ObjectFetcher, ObjectMetadata};
use crate::error::{ExporterError, Result};
use crate::types::ObjectReference;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
struct ObjectDocument {
    #[serde(default)]
    metadata: DocumentMeta,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentMeta {
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

/// Fetches object metadata through the `kubectl` CLI
#[derive(Debug, Clone)]
pub struct KubectlFetcher {
    program: String,
    context: Option<String>,
}

impl Default for KubectlFetcher {
    fn default() -> Self {
        Self {
            program: "kubectl".to_string(),
            context: None,
        }
    }
}

impl KubectlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific kubeconfig context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Use a different binary (e.g., a wrapper script)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, reference: &ObjectReference) -> Vec<String> {
        let mut args = vec!["get".to_string(), resource_arg(reference), reference.name.clone()];
        if !reference.namespace.is_empty() {
            args.push("--namespace".to_string());
            args.push(reference.namespace.clone());
        }
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args.push("--output".to_string());
        args.push("json".to_string());
        args
    }
}

/// `kind.version.group` for grouped APIs, the bare kind for the core group
fn resource_arg(reference: &ObjectReference) -> String {
    let kind = reference.kind.to_lowercase();
    match reference.api_version.split_once('/') {
        Some((group, version)) => format!("{}.{}.{}", kind, version, group),
        None => kind,
    }
}

#[async_trait]
impl ObjectFetcher for KubectlFetcher {
    async fn fetch(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        let out = tokio::process::Command::new(&self.program)
            .args(self.args(reference))
            .output()
            .await
            .map_err(|e| ExporterError::Lookup {
                object: reference.to_string(),
                reason: format!("failed to run `{}`: {}", self.program, e),
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            if stderr.contains("NotFound") || stderr.contains("not found") {
                return Err(ExporterError::NotFound(reference.to_string()));
            }
            return Err(ExporterError::Lookup {
                object: reference.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        let document: ObjectDocument = serde_json::from_slice(&out.stdout)?;
        Ok(ObjectMetadata {
            labels: document.metadata.labels,
            annotations: document.metadata.annotations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> ObjectReference {
        ObjectReference {
            kind: "Deployment".to_string(),
            namespace: "prod".to_string(),
            name: "web".to_string(),
            api_version: "apps/v1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resource_arg() {
        assert_eq!(resource_arg(&deployment()), "deployment.v1.apps");

        let node = ObjectReference {
            kind: "Node".to_string(),
            name: "node-a".to_string(),
            api_version: "v1".to_string(),
            ..Default::default()
        };
        assert_eq!(resource_arg(&node), "node");
    }

    #[test]
    fn test_args() {
        let fetcher = KubectlFetcher::new().with_context("staging");
        assert_eq!(
            fetcher.args(&deployment()),
            vec![
                "get",
                "deployment.v1.apps",
                "web",
                "--namespace",
                "prod",
                "--context",
                "staging",
                "--output",
                "json"
            ]
        );
    }

    #[test]
    fn test_cluster_scoped_args_have_no_namespace() {
        let node = ObjectReference {
            kind: "Node".to_string(),
            name: "node-a".to_string(),
            ..Default::default()
        };
        let args = KubectlFetcher::new().args(&node);
        assert!(!args.contains(&"--namespace".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_lookup_error() {
        let fetcher = KubectlFetcher::new().with_program("__nonexistent_kubectl_xyz__");
        let err = fetcher.fetch(&deployment()).await.unwrap_err();
        assert!(matches!(err, ExporterError::Lookup { .. }));
    }

    #[test]
    fn test_document_parsing() {
        let json = r#"{"kind":"Pod","metadata":{"name":"web","labels":{"app":"web"}}}"#;
        let document: ObjectDocument = serde_json::from_str(json).unwrap();
        assert_eq!(document.metadata.labels["app"], "web");
        assert!(document.metadata.annotations.is_empty());
    }
}
