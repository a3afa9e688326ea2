//! Document store abstraction.
//!
//! Notes live outside the relational database in a schemaless store of JSON
//! documents grouped into collections. A collection path names the parent
//! (`notes__boards/{board}/notes`, `notes__groups/{group}/notes`) and a
//! document id is unique only within its collection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use planner_core::NoteParent;

use crate::error::StoreResult;

/// Path of a document collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The notes collection owned by `parent`.
    pub fn notes_of(parent: &NoteParent) -> Self {
        match parent {
            NoteParent::Board { board } => Self(format!("notes__boards/{}/notes", board)),
            NoteParent::Group { group, .. } => Self(format!("notes__groups/{}/notes", group)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A document inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: CollectionPath,
    pub id: String,
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

/// A schemaless document store.
///
/// Each call is an independent operation; there are no transactions across
/// documents or collections.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Value>>;

    /// Creates or fully replaces a document.
    async fn set(&self, path: &DocumentPath, body: &Value) -> StoreResult<()>;

    /// Deletes a document, returning whether it existed.
    async fn delete(&self, path: &DocumentPath) -> StoreResult<bool>;

    /// Snapshot of every document in a collection, in id order.
    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>>;

    /// Releases connections. Further calls may fail.
    async fn close(&self) {}
}

/// Document store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<CollectionPath, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned())
    }

    async fn set(&self, path: &DocumentPath, body: &Value) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(path.collection.clone())
            .or_default()
            .insert(path.id.clone(), body.clone());
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&path.collection) else {
            return Ok(false);
        };
        let existed = docs.remove(&path.id).is_some();
        if docs.is_empty() {
            collections.remove(&path.collection);
        }
        Ok(existed)
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| Document {
                        id: id.clone(),
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
