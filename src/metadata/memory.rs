//! In-memory object fetcher for development and testing

use super::{ObjectFetcher, ObjectMetadata};
use crate::error::{ExporterError, Result};
use crate::types::ObjectReference;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Serves metadata from a table keyed by the object's cache key
///
/// Unknown objects yield `ExporterError::NotFound`.
#[derive(Default)]
pub struct MemoryObjectFetcher {
    objects: RwLock<HashMap<String, ObjectMetadata>>,
}

impl MemoryObjectFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object
    pub fn insert(&self, reference: &ObjectReference, metadata: ObjectMetadata) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        objects.insert(reference.cache_key(), metadata);
    }
}

#[async_trait]
impl ObjectFetcher for MemoryObjectFetcher {
    async fn fetch(&self, reference: &ObjectReference) -> Result<ObjectMetadata> {
        let objects = self.objects.read().map_err(|e| ExporterError::Lookup {
            object: reference.to_string(),
            reason: format!("Failed to acquire object table lock: {}", e),
        })?;
        objects
            .get(&reference.cache_key())
            .cloned()
            .ok_or_else(|| ExporterError::NotFound(reference.to_string()))
    }
}
