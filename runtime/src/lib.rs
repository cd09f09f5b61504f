//! # Tasklist Runtime
//!
//! Runtime implementation for the tasklist reducer architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and persistence.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, runs the reducer and executes its effects
//! - **Committed**: The outcome of one action, including persistence status
//! - **`StoreEvent`**: Change notifications broadcast to observers
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use std::sync::Arc;
use tasklist_core::{effect::Effect, environment::Persist, reducer::Reducer};
use tokio::sync::RwLock;

/// Metric names recorded by the runtime
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use std::sync::Arc;
    use tasklist_core::storage::StorageError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone)]
    pub enum StoreError {
        /// The state change was applied in memory but its snapshot could not
        /// be written. The in-memory state stays authoritative.
        #[error("failed to persist state: {0}")]
        Persistence(#[source] Arc<StorageError>),
    }

    impl From<StorageError> for StoreError {
        fn from(error: StorageError) -> Self {
            Self::Persistence(Arc::new(error))
        }
    }
}

pub use error::StoreError;

/// Notifications published by a [`Store`] after each accepted action
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// State was reduced; derived views should be recomputed
    Changed {
        /// Revision of the state after the action
        revision: u64,
    },

    /// A snapshot could not be written. The in-memory change was kept.
    PersistFailed {
        /// Revision whose snapshot failed
        revision: u64,
        /// Why the write failed
        error: StoreError,
    },
}

/// Result of sending one action through a [`Store`]
///
/// The reducer always runs to completion, so `value` is always present.
/// `persistence` reports whether the snapshot requested by the reducer (if
/// any) reached storage.
#[derive(Debug)]
#[must_use]
pub struct Committed<T> {
    /// Value read from state right after the reducer ran
    pub value: T,
    /// Outcome of the persistence effects for this action
    pub persistence: Result<(), StoreError>,
    /// Revision of the state after the action
    pub revision: u64,
}

impl<T> Committed<T> {
    /// Whether every requested snapshot was written
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.persistence.is_ok()
    }

    /// Discard the persistence outcome
    pub fn into_value(self) -> T {
        self.value
    }

    /// Treat a failed snapshot as an error
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] if persistence failed.
    pub fn into_result(self) -> Result<T, StoreError> {
        self.persistence.map(|()| self.value)
    }
}

/// Store runtime for coordinating reducer execution and persistence.
pub mod store {
    use super::{
        Arc, Committed, Effect, Persist, Reducer, RwLock, StoreError, StoreEvent,
        metrics as names,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::broadcast;

    /// Default capacity of the change-event channel
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies, including persistence)
    /// 4. Change notifications
    ///
    /// Actions are applied one at a time. The write lock is held while the
    /// reducer runs *and* while its [`Effect::Persist`] requests execute, so
    /// every snapshot reflects its own action and snapshots are written in
    /// action order.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        revision: Arc<AtomicU64>,
        events: broadcast::Sender<StoreEvent>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        E: Persist<S>,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The change-event channel buffers
        /// [`DEFAULT_BROADCAST_CAPACITY`] events per subscriber.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new Store with custom change-event capacity
        ///
        /// Slow subscribers that fall more than `capacity` events behind
        /// observe `RecvError::Lagged` and should re-read state.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (events, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                revision: Arc::new(AtomicU64::new(0)),
                events,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Executes the returned effects before releasing the lock
        /// 4. Publishes [`StoreEvent::Changed`] unless the action was rejected
        pub async fn send(&self, action: A) -> Committed<()> {
            self.send_and_read(action, |_| ()).await
        }

        /// Send an action and read from the resulting state atomically
        ///
        /// `read` runs under the same write lock as the reducer, so no other
        /// action can interleave between the change and the read.
        ///
        /// A reducer that returns an empty effect list has rejected the
        /// action and left state untouched: the revision stays where it was
        /// and no [`StoreEvent::Changed`] is published. State changes that
        /// need no snapshot return [`Effect::None`].
        ///
        /// [`Persist`] runs on the calling task while the write lock is held,
        /// so implementations must be fast and must not block for long.
        /// Readers and other senders wait for it to finish.
        #[tracing::instrument(skip(self, action, read), name = "store_send")]
        pub async fn send_and_read<F, T>(&self, action: A, read: F) -> Committed<T>
        where
            F: FnOnce(&S) -> T,
        {
            let mut state = self.state.write().await;

            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            names::counter!(names::ACTIONS_PROCESSED).increment(1);

            if effects.is_empty() {
                let value = read(&*state);
                drop(state);
                tracing::trace!("Action rejected by reducer; state unchanged");
                return Committed {
                    value,
                    persistence: Ok(()),
                    revision: self.revision(),
                };
            }

            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            let mut persistence = Ok(());

            for effect in effects {
                match effect {
                    Effect::None => {
                        tracing::trace!("Executing Effect::None (no-op)");
                    },
                    Effect::Persist => {
                        if let Err(error) = self.execute_persist(&state, revision) {
                            persistence = Err(error);
                        }
                    },
                }
            }

            let value = read(&*state);
            drop(state);

            #[allow(clippy::cast_precision_loss)]
            let gauge_value = revision as f64;
            names::gauge!(names::STATE_REVISION).set(gauge_value);

            // No subscribers is fine; nobody is rendering.
            let _ = self.events.send(StoreEvent::Changed { revision });

            Committed {
                value,
                persistence,
                revision,
            }
        }

        fn execute_persist(&self, state: &S, revision: u64) -> Result<(), StoreError> {
            match self.environment.persist(state) {
                Ok(()) => {
                    tracing::trace!(revision, "State persisted");
                    names::counter!(names::PERSIST_SUCCEEDED).increment(1);
                    Ok(())
                },
                Err(error) => {
                    let error = StoreError::from(error);
                    tracing::error!(revision, error = %error, "Failed to persist state");
                    names::counter!(names::PERSIST_FAILED).increment(1);
                    let _ = self.events.send(StoreEvent::PersistFailed {
                        revision,
                        error: error.clone(),
                    });
                    Err(error)
                },
            }
        }

        /// Read current state via a closure
        ///
        /// Access state through a closure to ensure the lock is released promptly:
        ///
        /// ```ignore
        /// let count = store.state(|s| s.todos.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Subscribe to change notifications
        ///
        /// Only events published after subscribing are received.
        #[must_use]
        pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
            self.events.subscribe()
        }

        /// Revision of the most recently committed state (0 before any accepted action)
        #[must_use]
        pub fn revision(&self) -> u64 {
            self.revision.load(Ordering::SeqCst)
        }

        /// Injected dependencies
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                revision: Arc::clone(&self.revision),
                events: self.events.clone(),
            }
        }
    }
}

pub use store::Store;
