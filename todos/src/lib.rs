//! Local task list with filtering, derived views and key-value persistence.
//!
//! The list is a reducer driven by the tasklist runtime. Every change to the
//! collection writes the whole collection to a [`KeyValueStore`] before the
//! next change is accepted; filters are transient and never written.
//!
//! - [`TodoStore`]: the operation set and read-only views
//! - [`TodoRepository`]: JSON blob persistence that tolerates corrupt data
//! - [`ThemeController`]: light/dark preference under its own key
//! - [`FileKeyValueStore`]: one file per key
//! - [`Config`]: environment-driven settings for the binary
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasklist::{FileKeyValueStore, Priority, TodoEnvironment, TodoStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileKeyValueStore::open(".tasklist")?);
//! let store = TodoStore::open(TodoEnvironment::production(storage, "vue-todo-app"));
//!
//! let todo = store.create_todo("Buy milk", Priority::High).await?;
//! store.toggle_todo(&todo.id).await;
//!
//! let stats = store.stats().await;
//! println!("{}/{} done", stats.completed, stats.total);
//! # Ok(())
//! # }
//! ```
//!
//! [`KeyValueStore`]: tasklist_core::storage::KeyValueStore

pub mod config;
pub mod file_store;
pub mod persistence;
pub mod reducer;
pub mod store;
pub mod theme;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use file_store::FileKeyValueStore;
pub use persistence::{DEFAULT_STORAGE_KEY, TodoRepository};
pub use reducer::{TodoAction, TodoEnvironment, TodoReducer};
pub use store::{CREATE_ATTEMPTS, TodoStore};
pub use theme::{SystemPreference, ThemeController, ThemeMode, ThemeSubscription};
pub use types::{
    CompletionFilter, FiltersPatch, Priority, PriorityFilter, Timestamp, Todo, TodoError,
    TodoFilters, TodoId, TodoPatch, TodoState, TodoStats, parse_text,
};
