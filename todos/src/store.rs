//! The task-list store façade.
//!
//! [`TodoStore`] wraps the generic runtime [`Store`] and exposes the task-list
//! operations with their natural return values. It is the only mutation
//! surface: callers get owned snapshots of todos, never references into the
//! collection.

use crate::reducer::{TodoAction, TodoEnvironment, TodoReducer};
use crate::types::{
    FiltersPatch, Priority, Todo, TodoError, TodoFilters, TodoId, TodoPatch, TodoState, TodoStats,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tasklist_runtime::{Committed, Store, StoreError, StoreEvent};
use tokio::sync::broadcast;

/// How many fresh ids [`TodoStore::create_todo`] draws before giving up
pub const CREATE_ATTEMPTS: u32 = 8;

/// Runtime store specialised for the task list
pub type TodoRuntime = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// Task-list store
///
/// Every mutating operation persists the full resulting collection before it
/// returns. A failed write keeps the in-memory change, is broadcast as
/// [`StoreEvent::PersistFailed`] and is remembered until
/// [`take_persist_error`](Self::take_persist_error) is called.
#[derive(Clone)]
pub struct TodoStore {
    runtime: TodoRuntime,
    persist_error: Arc<Mutex<Option<StoreError>>>,
}

impl TodoStore {
    /// Load the persisted collection and start a store over it
    #[must_use]
    pub fn open(env: TodoEnvironment) -> Self {
        Self::open_with_broadcast_capacity(
            env,
            tasklist_runtime::store::DEFAULT_BROADCAST_CAPACITY,
        )
    }

    /// Like [`open`](Self::open) with a custom change-event capacity
    #[must_use]
    pub fn open_with_broadcast_capacity(env: TodoEnvironment, capacity: usize) -> Self {
        let todos = env.repository.load();
        tracing::info!(key = env.repository.key(), count = todos.len(), "Opened todo store");

        Self {
            runtime: Store::with_broadcast_capacity(
                TodoState::new(todos),
                TodoReducer::new(),
                env,
                capacity,
            ),
            persist_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a todo at the end of the collection
    ///
    /// The text is trimmed but not validated; use
    /// [`parse_text`](crate::parse_text) to reject empty input first. If the
    /// id source hands out an id that is already taken (for example a
    /// sequential generator over a reopened collection), another id is drawn.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::DuplicateId`] if [`CREATE_ATTEMPTS`] ids in a row
    /// were already in use. Nothing is changed or persisted in that case.
    pub async fn create_todo(&self, text: &str, priority: Priority) -> Result<Todo, TodoError> {
        let mut attempt = 1;
        loop {
            let id = TodoId::new(self.runtime.environment().ids.next_id());
            let created = self
                .commit(
                    TodoAction::CreateTodo {
                        id: id.clone(),
                        text: text.to_string(),
                        priority,
                    },
                    |state| match state.last_error {
                        Some(_) => None,
                        None => state.todos.last().cloned(),
                    },
                )
                .await;

            if let Some(todo) = created {
                return Ok(todo);
            }
            if attempt == CREATE_ATTEMPTS {
                return Err(TodoError::DuplicateId(id));
            }
            tracing::warn!(%id, attempt, "Generated todo id already in use, drawing another");
            attempt += 1;
        }
    }

    /// Apply a partial update; `None` if no todo has this id
    pub async fn update_todo(&self, id: &TodoId, patch: TodoPatch) -> Option<Todo> {
        let lookup = id.clone();
        self.commit(
            TodoAction::UpdateTodo {
                id: id.clone(),
                patch,
            },
            move |state| state.get(&lookup).cloned(),
        )
        .await
    }

    /// Delete a todo; `false` if no todo has this id
    pub async fn delete_todo(&self, id: &TodoId) -> bool {
        self.commit(TodoAction::DeleteTodo { id: id.clone() }, succeeded)
            .await
    }

    /// Flip a todo's completion flag; `false` if no todo has this id
    pub async fn toggle_todo(&self, id: &TodoId) -> bool {
        self.commit(TodoAction::ToggleTodo { id: id.clone() }, succeeded)
            .await
    }

    /// Move the todo at `from_index` to `to_index`
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::OutOfRange`] if either index is not a position in
    /// the collection. Nothing is changed or persisted in that case.
    pub async fn reorder_todos(&self, from_index: usize, to_index: usize) -> Result<(), TodoError> {
        let rejected = self
            .commit(
                TodoAction::ReorderTodos {
                    from_index,
                    to_index,
                },
                |state| state.last_error.clone(),
            )
            .await;
        rejected.map_or(Ok(()), Err)
    }

    /// Remove every completed todo
    pub async fn clear_completed(&self) {
        self.commit(TodoAction::ClearCompleted, |_| ()).await;
    }

    /// Merge new filter criteria; never persisted
    pub async fn set_filters(&self, patch: FiltersPatch) {
        self.commit(TodoAction::SetFilters(patch), |_| ()).await;
    }

    /// Restore the default filter criteria
    pub async fn reset_filters(&self) {
        self.commit(TodoAction::ResetFilters, |_| ()).await;
    }

    async fn commit<F, T>(&self, action: TodoAction, read: F) -> T
    where
        F: FnOnce(&TodoState) -> T,
    {
        let committed = self.runtime.send_and_read(action, read).await;
        self.record(committed)
    }

    fn record<T>(&self, committed: Committed<T>) -> T {
        if let Err(error) = committed.persistence {
            *lock(&self.persist_error) = Some(error);
        }
        committed.value
    }

    /// All todos in collection order
    pub async fn todos(&self) -> Vec<Todo> {
        self.runtime.state(|state| state.todos.clone()).await
    }

    /// Active filter criteria
    pub async fn filters(&self) -> TodoFilters {
        self.runtime.state(|state| state.filters.clone()).await
    }

    /// Todos passing the active filters, in collection order
    pub async fn filtered_todos(&self) -> Vec<Todo> {
        self.runtime
            .state(|state| state.filtered_todos().into_iter().cloned().collect())
            .await
    }

    /// Filtered todos, incomplete first, then by `order`
    pub async fn sorted_todos(&self) -> Vec<Todo> {
        self.runtime
            .state(|state| state.sorted_todos().into_iter().cloned().collect())
            .await
    }

    /// Counts over the whole collection
    pub async fn stats(&self) -> TodoStats {
        self.runtime.state(TodoState::stats).await
    }

    /// One todo by id
    pub async fn get(&self, id: &TodoId) -> Option<Todo> {
        self.runtime.state(|state| state.get(id).cloned()).await
    }

    /// Subscribe to change and persistence-failure events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.runtime.subscribe()
    }

    /// Number of accepted actions since the store was opened
    ///
    /// Rejected actions (unknown id, out-of-range reorder, duplicate id) do
    /// not count.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.runtime.revision()
    }

    /// Most recent persistence failure, if any
    #[must_use]
    pub fn last_persist_error(&self) -> Option<StoreError> {
        lock(&self.persist_error).clone()
    }

    /// Take the most recent persistence failure, clearing it
    pub fn take_persist_error(&self) -> Option<StoreError> {
        lock(&self.persist_error).take()
    }
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("environment", self.runtime.environment())
            .field("revision", &self.runtime.revision())
            .finish_non_exhaustive()
    }
}

fn succeeded(state: &TodoState) -> bool {
    state.last_error.is_none()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
