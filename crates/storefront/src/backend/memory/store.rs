//! `HashMap`-backed document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::{BackendError, Document, DocumentStore, Fields, Query};

struct StoredDocument {
    version: u64,
    fields: Fields,
}

type Collections = HashMap<String, HashMap<String, StoredDocument>>;

/// In-memory document store.
///
/// Storage is `collection -> id -> document`. Clone-friendly via `Arc`.
///
/// Two knobs make it behave more like a remote service in tests:
/// - [`with_suspension`](Self::with_suspension) yields to the runtime before
///   every operation, so concurrent callers interleave at call boundaries;
/// - [`set_offline`](Self::set_offline) makes every operation fail with
///   [`BackendError::Unavailable`].
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    suspend: Arc<AtomicBool>,
    offline: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the async runtime before each operation.
    #[must_use]
    pub fn with_suspension(self) -> Self {
        self.suspend.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate losing the connection to the backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Whether a collection holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    async fn enter(&self) -> Result<(), BackendError> {
        if self.suspend.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "in-memory backend is offline".to_owned(),
            ));
        }
        Ok(())
    }

    fn write<F>(&self, operation: &'static str, f: F) -> Result<u64, BackendError>
    where
        F: FnOnce(&mut Collections) -> Result<u64, BackendError>,
    {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| BackendError::LockPoisoned(operation))?;
        let version = f(&mut collections)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(version)
    }
}

/// Merge `fields` into the document at `id`, creating it if absent.
fn merge_into(docs: &mut HashMap<String, StoredDocument>, id: &str, fields: Fields) -> u64 {
    let doc = docs.entry(id.to_owned()).or_insert_with(|| StoredDocument {
        version: 0,
        fields: Fields::new(),
    });
    doc.fields.extend(fields);
    doc.version += 1;
    doc.version
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        self.enter().await?;
        let collections = self
            .collections
            .read()
            .map_err(|_| BackendError::LockPoisoned("get"))?;

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Document {
                id: id.to_owned(),
                version: stored.version,
                fields: stored.fields.clone(),
            }))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<u64, BackendError> {
        self.enter().await?;
        self.write("set", |collections| {
            let docs = collections.entry(collection.to_owned()).or_default();
            let version = docs.get(id).map_or(0, |d| d.version) + 1;
            docs.insert(id.to_owned(), StoredDocument { version, fields });
            Ok(version)
        })
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<u64, BackendError> {
        self.enter().await?;
        self.write("merge", |collections| {
            let docs = collections.entry(collection.to_owned()).or_default();
            Ok(merge_into(docs, id, fields))
        })
    }

    async fn merge_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        fields: Fields,
    ) -> Result<u64, BackendError> {
        self.enter().await?;
        self.write("merge_if_version", |collections| {
            let docs = collections.entry(collection.to_owned()).or_default();
            let actual = docs.get(id).map_or(0, |d| d.version);
            if actual != expected_version {
                return Err(BackendError::VersionConflict {
                    collection: collection.to_owned(),
                    id: id.to_owned(),
                    expected: expected_version,
                    actual,
                });
            }
            Ok(merge_into(docs, id, fields))
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<u64, BackendError> {
        self.enter().await?;
        self.write("update", |collections| {
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| BackendError::NotFound {
                    collection: collection.to_owned(),
                    id: id.to_owned(),
                })?;
            doc.fields.extend(fields);
            doc.version += 1;
            Ok(doc.version)
        })
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError> {
        self.enter().await?;
        let id = Uuid::new_v4().simple().to_string();
        self.write("add", |collections| {
            let docs = collections.entry(collection.to_owned()).or_default();
            docs.insert(id.clone(), StoredDocument { version: 1, fields });
            Ok(1)
        })?;
        Ok(id)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        self.enter().await?;
        let collections = self
            .collections
            .read()
            .map_err(|_| BackendError::LockPoisoned("query"))?;

        let mut results: Vec<Document> = collections
            .get(collection)
            .into_iter()
            .flat_map(HashMap::iter)
            .filter(|(_, stored)| query.matches(&stored.fields))
            .map(|(id, stored)| Document {
                id: id.clone(),
                version: stored.version,
                fields: stored.fields.clone(),
            })
            .collect();

        // Unordered queries still come back in a deterministic order.
        results.sort_by(|a, b| a.id.cmp(&b.id));
        query.sort(&mut results);
        Ok(results)
    }
}
