//! In-process record store.
//!
//! Mirrors the NetBox filter conventions the reconciler relies on: a query key
//! `x` matches field `x`, and `x_id` matches the reference field `x` whether it
//! holds a bare id or a nested object. Used by `--dry-run` and by tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Collection, Query, Record, RecordStore, reference_id};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<Collection, Vec<Record>>,
    next_id: u64,
    creates: BTreeMap<Collection, usize>,
    patches: BTreeMap<Collection, usize>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds the given cluster
    #[must_use]
    pub fn with_cluster(id: u64, name: impl Into<String>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            let mut fields = Map::new();
            fields.insert("name".to_string(), Value::String(name.into()));
            state
                .records
                .entry(Collection::Clusters)
                .or_default()
                .push(Record { id, fields });
            state.next_id = state.next_id.max(id);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a record directly, bypassing operation counters
    pub fn insert(&self, collection: Collection, fields: Value) -> Record {
        let mut state = self.lock();
        let id = state.allocate_id();
        let record = Record {
            id,
            fields: object_fields(fields),
        };
        state
            .records
            .entry(collection)
            .or_default()
            .push(record.clone());
        record
    }

    /// Returns every record of a collection in creation order
    #[must_use]
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.lock()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of records created through the store API
    #[must_use]
    pub fn created(&self, collection: Collection) -> usize {
        self.lock().creates.get(&collection).copied().unwrap_or(0)
    }

    /// Number of records patched through the store API
    #[must_use]
    pub fn patched(&self, collection: Collection) -> usize {
        self.lock().patches.get(&collection).copied().unwrap_or(0)
    }

    /// Total creates across all collections
    #[must_use]
    pub fn total_created(&self) -> usize {
        self.lock().creates.values().sum()
    }
}

fn object_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(mut map) => {
            map.remove("id");
            map
        }
        _ => Map::new(),
    }
}

/// Renders a field the way it would appear in a query string
fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(_) => reference_id(value).map(|id| id.to_string()),
        _ => None,
    }
}

fn matches(record: &Record, key: &str, expected: &str) -> bool {
    if key == "id" {
        return record.id.to_string() == expected;
    }
    if let Some(value) = record.fields.get(key) {
        return render(value).as_deref() == Some(expected);
    }
    key.strip_suffix("_id")
        .and_then(|field| record.reference_id(field))
        .is_some_and(|id| id.to_string() == expected)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: Collection, id: u64) -> StoreResult<Option<Record>> {
        Ok(self
            .lock()
            .records
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn filter(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>> {
        Ok(self
            .lock()
            .records
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| query.pairs().iter().all(|(k, v)| matches(r, k, v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: Collection, payload: &Value) -> StoreResult<Record> {
        let mut state = self.lock();
        let id = state.allocate_id();
        let record = Record {
            id,
            fields: object_fields(payload.clone()),
        };
        state
            .records
            .entry(collection)
            .or_default()
            .push(record.clone());
        *state.creates.entry(collection).or_default() += 1;
        tracing::debug!(%collection, id, "Created record in memory");
        Ok(record)
    }

    async fn patch(
        &self,
        collection: Collection,
        id: u64,
        payload: &Value,
    ) -> StoreResult<Record> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(StoreError::NotFound {
                collection: collection.path(),
                id,
            })?;

        record.fields.extend(object_fields(payload.clone()));
        let updated = record.clone();
        *state.patches.entry(collection).or_default() += 1;
        Ok(updated)
    }
}
