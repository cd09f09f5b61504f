//! # Tasklist Testing
//!
//! Testing utilities and helpers for the tasklist reducer architecture.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits
//! - An in-memory key-value store with failure injection
//! - A given/when/then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tasklist::{Priority, TodoEnvironment, TodoRepository, TodoStore};
//! use tasklist_testing::{InMemoryKeyValueStore, SequentialIdGenerator, test_clock};
//!
//! #[tokio::test]
//! async fn creates_todo() {
//!     let storage = Arc::new(InMemoryKeyValueStore::new());
//!     let store = TodoStore::open(TodoEnvironment::new(
//!         Arc::new(test_clock()),
//!         Arc::new(SequentialIdGenerator::default()),
//!         TodoRepository::new(storage.clone()),
//!     ));
//!
//!     store.create_todo("Buy milk", Priority::High).await.unwrap();
//!
//!     assert_eq!(storage.write_count(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use tasklist_core::environment::{Clock, IdGenerator};


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use tasklist_core::storage::{KeyValueStore, StorageError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tasklist_testing::mocks::FixedClock;
    /// use tasklist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::days(20_089)
    }

    /// Clock that moves only when told to
    ///
    /// Starts at 2025-01-01 00:00:00 UTC.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at the default test time
        #[must_use]
        pub fn new() -> Self {
            Self {
                time: Mutex::new(epoch()),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Predictable ids: `todo-1`, `todo-2`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Ids of the form `<prefix>-<n>`, starting at 1
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new("todo")
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }

    /// In-memory key-value store
    ///
    /// Records every successful write so tests can assert on persistence
    /// order, and can be switched into failing reads or writes.
    #[derive(Debug, Default)]
    pub struct InMemoryKeyValueStore {
        entries: Mutex<HashMap<String, String>>,
        writes: Mutex<Vec<(String, String)>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl InMemoryKeyValueStore {
        /// Create an empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a store holding one entry
        #[must_use]
        pub fn with_entry(key: &str, value: &str) -> Self {
            let store = Self::new();
            lock(&store.entries).insert(key.to_string(), value.to_string());
            store
        }

        /// Make subsequent `get` calls fail
        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        /// Make subsequent `set` and `remove` calls fail
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Current raw value under `key`
        #[must_use]
        pub fn raw(&self, key: &str) -> Option<String> {
            lock(&self.entries).get(key).cloned()
        }

        /// Number of successful `set` calls so far
        #[must_use]
        pub fn write_count(&self) -> usize {
            lock(&self.writes).len()
        }

        /// Every successful write, oldest first
        #[must_use]
        pub fn writes(&self) -> Vec<(String, String)> {
            lock(&self.writes).clone()
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl KeyValueStore for InMemoryKeyValueStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(format!(
                    "reads disabled for '{key}'"
                )));
            }
            Ok(lock(&self.entries).get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
            lock(&self.entries).insert(key.to_string(), value.to_string());
            lock(&self.writes).push((key.to_string(), value.to_string()));
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(format!(
                    "writes disabled for '{key}'"
                )));
            }
            lock(&self.entries).remove(key);
            Ok(())
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryKeyValueStore, ManualClock, SequentialIdGenerator, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tasklist_core::storage::{KeyValueStore, StorageError};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        let before = clock.now();
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now() - before, chrono::Duration::seconds(5));
    }

    #[test]
    fn sequential_ids() {
        let ids = SequentialIdGenerator::default();
        assert_eq!(ids.next_id(), "todo-1");
        assert_eq!(ids.next_id(), "todo-2");
    }

    #[test]
    fn in_memory_store_round_trip() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.write_count(), 1);

        store.remove("k").unwrap();
        assert_eq!(store.raw("k"), None);
    }

    #[test]
    fn in_memory_store_injected_failures() {
        let store = InMemoryKeyValueStore::with_entry("k", "v");

        store.fail_writes(true);
        assert!(matches!(
            store.set("k", "w"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert!(store.remove("k").is_err());
        assert_eq!(store.raw("k").as_deref(), Some("v"));

        store.fail_reads(true);
        assert!(store.get("k").is_err());
    }
}
