//! # Tasklist Core
//!
//! Core traits and types for the tasklist reducer architecture.
//!
//! This crate provides the abstractions shared by the runtime and the domain:
//!
//! - **State**: Domain state owned by a store
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (clock, ids, storage)
//!
//! ## Example
//!
//! ```
//! use tasklist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! enum CounterAction {
//!     Increment,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect; 4]> {
//!         match action {
//!             CounterAction::Increment => {
//!                 state.count += 1;
//!                 smallvec![Effect::Persist]
//!             }
//!         }
//!     }
//! }
//!
//! let mut state = CounterState::default();
//! let effects = CounterReducer.reduce(&mut state, CounterAction::Increment, &());
//! assert_eq!(state.count, 1);
//! assert_eq!(effects.as_slice(), &[Effect::Persist]);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// All I/O they need is described as an [`Effect`](crate::effect::Effect) and
/// carried out by the runtime.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// An empty list marks the action as rejected with state untouched.
        /// Return [`Effect::None`] for a change that needs no effect.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers. They are executed by the Store
/// runtime after the reducer has updated state.
pub mod effect {
    /// Effect type - describes a side effect to be executed
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Effect {
        /// No-op effect
        None,

        /// Write a snapshot of the current state through the environment's
        /// [`Persist`](crate::environment::Persist) implementation.
        ///
        /// The runtime executes this before accepting the next action, so
        /// snapshots are written in the same order as the mutations.
        Persist,
    }

    impl Effect {
        /// Returns true if this effect requests a state snapshot
        #[must_use]
        pub const fn is_persist(self) -> bool {
            matches!(self, Self::Persist)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter. Production implementations live here;
/// deterministic ones live in `tasklist-testing`.
pub mod environment {
    use super::storage::StorageError;
    use chrono::{DateTime, Utc};
    use rand::Rng;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Generates opaque identifiers for new aggregates
    pub trait IdGenerator: Send + Sync {
        /// Produce the next identifier
        fn next_id(&self) -> String;
    }

    /// Length of the random suffix appended by [`TimestampIdGenerator`]
    pub const ID_SUFFIX_LEN: usize = 9;

    const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    /// `<unix-millis>-<random base36 suffix>` identifiers
    ///
    /// Uniqueness is probabilistic: two ids generated in the same millisecond
    /// only collide if their suffixes do.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TimestampIdGenerator;

    impl TimestampIdGenerator {
        /// Build an id for the given instant
        #[must_use]
        pub fn id_at(at: DateTime<Utc>) -> String {
            let mut rng = rand::thread_rng();
            let suffix: String = (0..ID_SUFFIX_LEN)
                .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
                .collect();
            format!("{}-{suffix}", at.timestamp_millis())
        }
    }

    impl IdGenerator for TimestampIdGenerator {
        fn next_id(&self) -> String {
            Self::id_at(Utc::now())
        }
    }

    /// Writes a snapshot of some state to durable storage
    ///
    /// Implemented by environments whose reducers return
    /// [`Effect::Persist`](crate::effect::Effect::Persist).
    pub trait Persist<S> {
        /// Persist the full state
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the underlying store rejects the write.
        fn persist(&self, state: &S) -> Result<(), StorageError>;
    }
}

/// Storage module - the local key-value store the application persists into
pub mod storage {
    use thiserror::Error;

    /// Errors raised by a [`KeyValueStore`]
    ///
    /// Every variant keeps the original cause so callers can report it.
    #[derive(Error, Debug)]
    pub enum StorageError {
        /// The backing store cannot be used at all (disabled, not mounted, ...)
        #[error("storage unavailable: {0}")]
        Unavailable(String),

        /// The write would exceed the store's capacity
        #[error("storage quota exceeded while writing '{key}'")]
        QuotaExceeded {
            /// Key being written
            key: String,
        },

        /// An I/O operation on the backing medium failed
        #[error("storage I/O failed for '{key}': {source}")]
        Io {
            /// Key being accessed
            key: String,
            /// Underlying error
            #[source]
            source: std::io::Error,
        },

        /// The value could not be serialized
        #[error("failed to serialize value: {0}")]
        Serialization(#[from] serde_json::Error),
    }

    /// A string-keyed, string-valued local store
    ///
    /// Each call is a single operation from the caller's point of view: a
    /// `set` either replaces the whole value or leaves the old one in place.
    pub trait KeyValueStore: Send + Sync {
        /// Read the value stored under `key`, `None` if absent
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the store cannot be read.
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

        /// Replace the value stored under `key`
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the write fails.
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

        /// Remove `key`; removing an absent key is not an error
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the removal fails.
        fn remove(&self, key: &str) -> Result<(), StorageError>;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::Utc;
    use super::effect::Effect;
    use super::environment::{Clock, ID_SUFFIX_LEN, IdGenerator, SystemClock, TimestampIdGenerator};
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn id_has_millis_prefix_and_base36_suffix() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let id = TimestampIdGenerator::id_at(at);
        let (millis, suffix) = id.split_once('-').unwrap();

        assert_eq!(millis, at.timestamp_millis().to_string());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn generated_ids_differ() {
        let ids = TimestampIdGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }

    #[test]
    fn persist_effect_predicate() {
        assert!(Effect::Persist.is_persist());
        assert!(!Effect::None.is_persist());
    }

    proptest! {
        #[test]
        fn id_prefix_tracks_time(secs in 0i64..4_000_000_000) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let id = TimestampIdGenerator::id_at(at);
            let prefix = format!("{}-", secs * 1000);
            prop_assert!(id.starts_with(&prefix));
        }
    }
}
