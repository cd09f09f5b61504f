//! Persistence adapter: the whole collection as one JSON blob under one key.
//!
//! Writes replace the blob in a single [`KeyValueStore::set`]. Reads never
//! fail: a missing blob is an empty list, a corrupt blob is logged and
//! treated as empty, and individual records that do not match the persisted
//! shape are dropped while the rest are kept.

use crate::types::{Timestamp, Todo, TodoId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tasklist_core::environment::{Clock, IdGenerator, SystemClock, TimestampIdGenerator};
use tasklist_core::storage::{KeyValueStore, StorageError};
use thiserror::Error;

/// Key the collection is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "vue-todo-app";

/// Metric counting records discarded by [`TodoRepository::load`]
pub const DROPPED_RECORDS: &str = "todos.load.dropped_records";

/// Fresh `<unix-millis>-<random>` todo id
#[must_use]
pub fn generate_id() -> TodoId {
    TodoId::new(TimestampIdGenerator.next_id())
}

/// Current time in the persisted timestamp format
#[must_use]
pub fn timestamp() -> Timestamp {
    Timestamp::from_datetime(SystemClock.now())
}

/// Why a stored blob could not be read as a todo list
///
/// Only ever logged; [`TodoRepository::load`] recovers from all of these.
#[derive(Error, Debug)]
pub enum MalformedPersistedData {
    /// The store could not be read
    #[error("could not read stored todos: {0}")]
    Storage(#[from] StorageError),

    /// The blob is not JSON
    #[error("stored todos are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The blob is JSON but not an array
    #[error("stored todos are not an array")]
    NotAnArray,
}

/// Reads and writes the todo collection through a [`KeyValueStore`]
///
/// Holds no todo state of its own.
#[derive(Clone)]
pub struct TodoRepository {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl fmt::Debug for TodoRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoRepository")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TodoRepository {
    /// Repository using [`DEFAULT_STORAGE_KEY`]
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Repository using a custom key
    #[must_use]
    pub fn with_key(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Key the collection is stored under
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize and store the full collection
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the write fails. The
    /// previous blob is left in place.
    pub fn save(&self, todos: &[Todo]) -> Result<(), StorageError> {
        let blob = serde_json::to_string(todos)?;
        self.storage.set(&self.key, &blob)?;
        tracing::debug!(key = %self.key, count = todos.len(), "Saved todos");
        Ok(())
    }

    /// Load the stored collection
    ///
    /// Returns an empty list when nothing is stored or the blob is unusable,
    /// and drops records that do not have every field with the right type.
    #[must_use]
    pub fn load(&self) -> Vec<Todo> {
        match self.try_load() {
            Ok(todos) => todos,
            Err(error) => {
                tracing::warn!(key = %self.key, error = %error, "Failed to load todos, starting empty");
                Vec::new()
            },
        }
    }

    fn try_load(&self) -> Result<Vec<Todo>, MalformedPersistedData> {
        let Some(blob) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        if blob.is_empty() {
            return Ok(Vec::new());
        }

        let Value::Array(records) = serde_json::from_str::<Value>(&blob)? else {
            return Err(MalformedPersistedData::NotAnArray);
        };

        let total = records.len();
        let todos: Vec<Todo> = records
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect();

        let dropped = total - todos.len();
        if dropped > 0 {
            tracing::warn!(key = %self.key, dropped, kept = todos.len(), "Dropped malformed todo records");
            metrics::counter!(DROPPED_RECORDS).increment(dropped as u64);
        }

        Ok(todos)
    }

    /// Remove the stored collection
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the removal fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }
}
