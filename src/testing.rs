//! In-memory seed target for tests.
//!
//! `MemoryStore` mimics the parts of MongoDB the seeder relies on: implicit
//! collection creation on insert, a unique `_id` index per collection, and
//! drop/create semantics. It also records provisioning calls and lets tests
//! inject failures.

use crate::error::SeedError;
use crate::target::{BoxError, Connector, SeedTarget, WriteFailure};
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct StoreState {
    collections: BTreeMap<String, Vec<Document>>,
    indexes: BTreeMap<String, Vec<String>>,
    dropped: Vec<String>,
    created: Vec<String>,
    insert_failures: Vec<(String, Bson, WriteFailure)>,
    provision_failure: Option<String>,
    in_flight: usize,
    max_in_flight: usize,
    connects: usize,
    shutdowns: usize,
    database_drops: usize,
}

/// Shared in-memory database. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A target handle on this store.
    pub fn target(&self) -> MemoryTarget {
        MemoryTarget {
            store: self.clone(),
        }
    }

    /// A connector handing out targets on this store.
    pub fn connector(&self, database: impl Into<String>) -> MemoryConnector {
        MemoryConnector {
            store: self.clone(),
            database: database.into(),
            connect_failure: None,
        }
    }

    /// Replace the contents of a collection.
    pub fn put(&self, collection: &str, documents: Vec<Document>) {
        self.state()
            .collections
            .insert(collection.to_string(), documents);
    }

    /// Register a secondary index name on a collection.
    pub fn add_index(&self, collection: &str, index: &str) {
        self.state()
            .indexes
            .entry(collection.to_string())
            .or_default()
            .push(index.to_string());
    }

    /// Make inserts of the document with this `_id` fail with `failure`.
    pub fn fail_insert(&self, collection: &str, id: Bson, failure: WriteFailure) {
        self.state()
            .insert_failures
            .push((collection.to_string(), id, failure));
    }

    /// Make drop and create calls fail with `message`.
    pub fn fail_provisioning(&self, message: &str) {
        self.state().provision_failure = Some(message.to_string());
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.state()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.state().collections.keys().cloned().collect()
    }

    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.state()
            .indexes
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dropped(&self) -> Vec<String> {
        self.state().dropped.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state().created.clone()
    }

    /// Highest number of inserts observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn shutdowns(&self) -> usize {
        self.state().shutdowns
    }

    pub fn database_drops(&self) -> usize {
        self.state().database_drops
    }
}

/// [`SeedTarget`] over a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryTarget {
    store: MemoryStore,
}

impl MemoryTarget {
    fn try_insert(&self, collection: &str, mut document: Document) -> Result<(), WriteFailure> {
        let mut state = self.store.state();

        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert("_id", id.clone());
                id
            }
        };

        if let Some((_, _, failure)) = state
            .insert_failures
            .iter()
            .find(|(name, failing_id, _)| name == collection && *failing_id == id)
        {
            return Err(failure.clone());
        }

        let documents = state.collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|existing| existing.get("_id") == Some(&id)) {
            return Err(WriteFailure::from_code(
                Some(11000),
                format!(
                    "E11000 duplicate key error collection: {collection} \
                     index: _id_ dup key: {{ _id: {id} }}"
                ),
            ));
        }
        documents.push(document);
        Ok(())
    }
}

#[async_trait]
impl SeedTarget for MemoryTarget {
    async fn list_collection_names(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.store.collection_names())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), BoxError> {
        let mut state = self.store.state();
        if let Some(message) = &state.provision_failure {
            return Err(message.clone().into());
        }
        state.collections.remove(collection);
        state.indexes.remove(collection);
        state.dropped.push(collection.to_string());
        Ok(())
    }

    async fn create_collection(&self, collection: &str) -> Result<(), BoxError> {
        let mut state = self.store.state();
        if let Some(message) = &state.provision_failure {
            return Err(message.clone().into());
        }
        if state.collections.contains_key(collection) {
            return Err(format!("Collection {collection} already exists.").into());
        }
        state.collections.insert(collection.to_string(), Vec::new());
        state.created.push(collection.to_string());
        Ok(())
    }

    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), WriteFailure> {
        {
            let mut state = self.store.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        // Give other inserts a chance to start before this one completes
        tokio::task::yield_now().await;
        let result = self.try_insert(collection, document);

        self.store.state().in_flight -= 1;
        result
    }

    async fn drop_database(&self) -> Result<(), BoxError> {
        let mut state = self.store.state();
        state.collections.clear();
        state.indexes.clear();
        state.database_drops += 1;
        Ok(())
    }

    async fn shutdown(&self) {
        self.store.state().shutdowns += 1;
    }
}

/// [`Connector`] over a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
    database: String,
    connect_failure: Option<String>,
}

impl MemoryConnector {
    /// Make every connection attempt fail with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.connect_failure = Some(message.to_string());
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Target = MemoryTarget;

    async fn connect(&self) -> Result<MemoryTarget, SeedError> {
        self.store.state().connects += 1;
        match &self.connect_failure {
            Some(message) => Err(SeedError::Connection {
                target: format!("memory://{}", self.database),
                source: message.clone().into(),
            }),
            None => Ok(self.store.target()),
        }
    }

    fn database_name(&self) -> &str {
        &self.database
    }
}
