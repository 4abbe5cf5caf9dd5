//! Metadata lookup: labels and annotations of an event's involved object
//!
//! `MetadataLookup` is the capability the watcher enriches events with.
//! `MetadataCache` implements it on top of any `ObjectFetcher`, keeping the
//! most recently used objects in an LRU so repeated events about the same
//! object do not hit the backend again.

use crate::error::{ExporterError, Result};
use crate::types::ObjectReference;
use async_trait::async_trait;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod kubectl;
pub mod memory;

pub use kubectl::KubectlFetcher;
pub use memory::MemoryObjectFetcher;

/// Default number of objects kept per cache
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Keyed lookup of supplementary string attributes for an object
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, reference: &ObjectReference) -> Result<HashMap<String, String>>;
}

/// Labels and annotations of a live object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// Backend that resolves an object reference to its metadata
///
/// Implementations return `ExporterError::NotFound` when the object no
/// longer exists.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, reference: &ObjectReference) -> Result<ObjectMetadata>;
}

/// Which attribute set a [`MetadataCache`] serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Labels,
    Annotations,
}

impl MetadataField {
    fn select(self, metadata: ObjectMetadata) -> HashMap<String, String> {
        match self {
            Self::Labels => metadata.labels,
            Self::Annotations => metadata.annotations,
        }
    }
}

/// LRU-cached lookup of one metadata field
pub struct MetadataCache {
    fetcher: Arc<dyn ObjectFetcher>,
    field: MetadataField,
    entries: Mutex<LruCache<String, HashMap<String, String>>>,
}

impl MetadataCache {
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, field: MetadataField, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            field,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Label cache with the default capacity
    pub fn labels(fetcher: Arc<dyn ObjectFetcher>) -> Self {
        Self::new(fetcher, MetadataField::Labels, DEFAULT_CACHE_SIZE)
    }

    /// Annotation cache with the default capacity
    pub fn annotations(fetcher: Arc<dyn ObjectFetcher>) -> Self {
        Self::new(fetcher, MetadataField::Annotations, DEFAULT_CACHE_SIZE)
    }

    pub fn field(&self) -> MetadataField {
        self.field
    }

    /// Number of cached objects
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl MetadataLookup for MetadataCache {
    async fn lookup(&self, reference: &ObjectReference) -> Result<HashMap<String, String>> {
        let key = reference.cache_key();
        if let Some(cached) = self.entries.lock().await.get(&key) {
            return Ok(cached.clone());
        }

        // The lock is not held while fetching; concurrent misses for the same
        // object may both fetch, and the last one wins.
        let values = match self.fetcher.fetch(reference).await {
            Ok(metadata) => self.field.select(metadata),
            Err(ExporterError::NotFound(_)) => {
                tracing::debug!(object = %reference, "Involved object no longer exists");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        self.entries.lock().await.put(key, values.clone());
        Ok(values)
    }
}
