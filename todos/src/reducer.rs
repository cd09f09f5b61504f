//! Reducer logic for the task list.
//!
//! Every action that changes the collection returns [`Effect::Persist`], so
//! the runtime writes the resulting collection before the next action runs.
//! Filter changes return [`Effect::None`]: views change, storage does not.
//! Rejected actions (unknown or duplicate id, bad index) return no effects at
//! all and are recorded in [`TodoState::last_error`].

use crate::persistence::TodoRepository;
use crate::types::{
    FiltersPatch, Priority, Timestamp, Todo, TodoError, TodoFilters, TodoId, TodoPatch, TodoState,
    order_at,
};
use std::sync::Arc;
use tasklist_core::environment::{Clock, IdGenerator, Persist, SystemClock, TimestampIdGenerator};
use tasklist_core::storage::{KeyValueStore, StorageError};
use tasklist_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Environment dependencies for the Todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Clock for `createdAt`/`updatedAt`
    pub clock: Arc<dyn Clock>,
    /// Source of new todo ids
    pub ids: Arc<dyn IdGenerator>,
    /// Where the collection is persisted
    pub repository: TodoRepository,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        repository: TodoRepository,
    ) -> Self {
        Self {
            clock,
            ids,
            repository,
        }
    }

    /// Wall clock, timestamp ids and the given storage under `key`
    #[must_use]
    pub fn production(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(TimestampIdGenerator),
            TodoRepository::with_key(storage, key),
        )
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(self.clock.now())
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl Persist<TodoState> for TodoEnvironment {
    fn persist(&self, state: &TodoState) -> Result<(), StorageError> {
        self.repository.save(&state.todos)
    }
}

/// Actions accepted by the task list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoAction {
    /// Append a new todo; the text is trimmed
    CreateTodo {
        /// Identifier for the new todo
        id: TodoId,
        /// Text as entered
        text: String,
        /// Priority of the new todo
        priority: Priority,
    },

    /// Apply a partial update to one todo
    UpdateTodo {
        /// Todo to update
        id: TodoId,
        /// Fields to change
        patch: TodoPatch,
    },

    /// Remove one todo
    DeleteTodo {
        /// Todo to delete
        id: TodoId,
    },

    /// Flip the completion flag of one todo
    ToggleTodo {
        /// Todo to toggle
        id: TodoId,
    },

    /// Move the todo at one collection position to another
    ReorderTodos {
        /// Current position
        from_index: usize,
        /// Position after the move
        to_index: usize,
    },

    /// Remove every completed todo
    ClearCompleted,

    /// Merge new filter criteria
    SetFilters(FiltersPatch),

    /// Restore the default filter criteria
    ResetFilters,
}

/// Reducer for the task list
#[derive(Clone, Copy, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(state: &mut TodoState, error: TodoError) -> SmallVec<[Effect; 4]> {
        tracing::debug!(error = %error, "Action rejected");
        state.last_error = Some(error);
        SmallVec::new()
    }

    fn check_index(index: usize, len: usize) -> Result<(), TodoError> {
        if index < len {
            Ok(())
        } else {
            Err(TodoError::OutOfRange { index, len })
        }
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        state.last_error = None;

        match action {
            TodoAction::CreateTodo { id, text, priority } => {
                if state.position(&id).is_some() {
                    return Self::reject(state, TodoError::DuplicateId(id));
                }
                let now = env.now();
                let todo = Todo {
                    id,
                    text: text.trim().to_string(),
                    completed: false,
                    priority,
                    order: order_at(state.todos.len()),
                    created_at: now.clone(),
                    updated_at: now,
                };
                tracing::debug!(id = %todo.id, order = todo.order, "Todo created");
                state.todos.push(todo);
                smallvec![Effect::Persist]
            },

            TodoAction::UpdateTodo { id, patch } => {
                let now = env.now();
                let Some(todo) = state.todos.iter_mut().find(|todo| todo.id == id) else {
                    return Self::reject(state, TodoError::NotFound(id));
                };
                patch.apply(todo);
                todo.updated_at = now;
                tracing::debug!(%id, "Todo updated");
                smallvec![Effect::Persist]
            },

            TodoAction::DeleteTodo { id } => {
                let Some(index) = state.position(&id) else {
                    return Self::reject(state, TodoError::NotFound(id));
                };
                state.todos.remove(index);
                state.renumber();
                tracing::debug!(%id, remaining = state.todos.len(), "Todo deleted");
                smallvec![Effect::Persist]
            },

            TodoAction::ToggleTodo { id } => {
                let now = env.now();
                let Some(todo) = state.todos.iter_mut().find(|todo| todo.id == id) else {
                    return Self::reject(state, TodoError::NotFound(id));
                };
                todo.completed = !todo.completed;
                todo.updated_at = now;
                tracing::debug!(%id, completed = todo.completed, "Todo toggled");
                smallvec![Effect::Persist]
            },

            TodoAction::ReorderTodos {
                from_index,
                to_index,
            } => {
                let len = state.todos.len();
                if let Err(error) = Self::check_index(from_index, len)
                    .and_then(|()| Self::check_index(to_index, len))
                {
                    return Self::reject(state, error);
                }
                let todo = state.todos.remove(from_index);
                state.todos.insert(to_index, todo);
                state.renumber();
                tracing::debug!(from_index, to_index, "Todos reordered");
                smallvec![Effect::Persist]
            },

            TodoAction::ClearCompleted => {
                let before = state.todos.len();
                state.todos.retain(|todo| !todo.completed);
                state.renumber();
                tracing::debug!(removed = before - state.todos.len(), "Completed todos cleared");
                smallvec![Effect::Persist]
            },

            TodoAction::SetFilters(patch) => {
                state.filters.merge(patch);
                smallvec![Effect::None]
            },

            TodoAction::ResetFilters => {
                state.filters = TodoFilters::default();
                smallvec![Effect::None]
            },
        }
    }
}
