//! Domain types for the task list.
//!
//! A task list is an ordered collection of [`Todo`] items plus the transient
//! [`TodoFilters`] the user is viewing them through. Filtered, sorted and
//! statistical views are derived from [`TodoState`] on every read; nothing
//! derived is stored.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors reported by task-list operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// Todo text is empty after trimming
    #[error("todo text cannot be empty")]
    EmptyText,

    /// A position passed to a reorder is past the end of the collection
    #[error("index {index} is out of range for {len} todos")]
    OutOfRange {
        /// Offending index
        index: usize,
        /// Collection size at the time of the call
        len: usize,
    },

    /// No todo has this id
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// A new todo was given an id that is already in the collection
    #[error("todo id {0} is already in use")]
    DuplicateId(TodoId),

    /// A string did not name a known priority, filter or theme mode
    #[error("unknown value '{0}'")]
    UnknownValue(String),
}

/// Trim user input and reject it if nothing is left
///
/// [`TodoStore::create_todo`](crate::TodoStore::create_todo) only trims; call
/// this first when the input comes straight from a user.
///
/// # Errors
///
/// Returns [`TodoError::EmptyText`] for empty or whitespace-only input.
pub fn parse_text(input: &str) -> Result<String, TodoError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(TodoError::EmptyText);
    }
    Ok(text.to_string())
}

/// Opaque, immutable identifier of a todo
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Wrap an existing identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Priority classification of a todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Do first
    High,
    /// Default
    Medium,
    /// Whenever
    Low,
}

impl Priority {
    /// Every priority, highest first
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Lowercase name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TodoError::UnknownValue(s.to_string()))
    }
}

/// Point in time stored as an ISO-8601 string
///
/// Timestamps written by this crate are UTC with millisecond precision
/// (`2025-01-01T00:00:00.000Z`), which sorts lexically. Loaded timestamps are
/// kept verbatim, even when they do not parse.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Format an instant
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Keep a stored value as-is
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Stored text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into an instant, `None` if the stored text is not RFC 3339
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single task
///
/// Serialized with camelCase keys, exactly the seven persisted fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier, assigned at creation
    pub id: TodoId,
    /// Trimmed task text
    pub text: String,
    /// Whether the task is done
    pub completed: bool,
    /// Priority classification
    pub priority: Priority,
    /// Display rank, dense `0..N` after any removal or reorder
    #[serde(deserialize_with = "deserialize_order")]
    pub order: u32,
    /// When the todo was created
    pub created_at: Timestamp,
    /// When the todo last changed
    pub updated_at: Timestamp,
}

/// Accept any JSON number for `order`; fractions truncate, negatives clamp to 0.
fn deserialize_order<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let order = raw as u32;
    Ok(order)
}

/// Convert a collection position into an `order` value
pub(crate) fn order_at(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Partial update of a todo; `None` fields are left untouched
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    /// Replacement text, applied as given
    pub text: Option<String>,
    /// New completion flag
    pub completed: Option<bool>,
    /// New priority
    pub priority: Option<Priority>,
}

impl TodoPatch {
    /// Set the text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the completion flag
    #[must_use]
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Set the priority
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub(crate) fn apply(self, todo: &mut Todo) {
        if let Some(text) = self.text {
            todo.text = text;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
    }
}

/// Priority predicate of the filter criteria
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    /// Any priority
    #[default]
    All,
    /// Only [`Priority::High`]
    High,
    /// Only [`Priority::Medium`]
    Medium,
    /// Only [`Priority::Low`]
    Low,
}

impl PriorityFilter {
    /// Whether a todo with `priority` passes
    #[must_use]
    pub const fn matches(self, priority: Priority) -> bool {
        matches!(
            (self, priority),
            (Self::All, _)
                | (Self::High, Priority::High)
                | (Self::Medium, Priority::Medium)
                | (Self::Low, Priority::Low)
        )
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => Self::High,
            Priority::Medium => Self::Medium,
            Priority::Low => Self::Low,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Priority>().map(Self::from)
    }
}

/// Completion predicate of the filter criteria
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFilter {
    /// Done and not done
    #[default]
    All,
    /// Only completed todos
    Completed,
    /// Only todos still open
    Incomplete,
}

impl CompletionFilter {
    /// Whether a todo with this completion flag passes
    #[must_use]
    pub const fn matches(self, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Completed => completed,
            Self::Incomplete => !completed,
        }
    }
}

impl FromStr for CompletionFilter {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" => Ok(Self::Completed),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(TodoError::UnknownValue(s.to_string())),
        }
    }
}

/// Transient view criteria; never persisted
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFilters {
    /// Case-insensitive substring the text must contain
    pub search: String,
    /// Priority predicate
    pub priority: PriorityFilter,
    /// Completion predicate
    pub completed: CompletionFilter,
}

impl TodoFilters {
    /// Whether `todo` passes all three predicates
    #[must_use]
    pub fn matches(&self, todo: &Todo) -> bool {
        self.priority.matches(todo.priority)
            && self.completed.matches(todo.completed)
            && todo
                .text
                .to_lowercase()
                .contains(&self.search.to_lowercase())
    }

    /// Overwrite the criteria present in `patch`
    pub fn merge(&mut self, patch: FiltersPatch) {
        if let Some(search) = patch.search {
            self.search = search;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Partial update of the filter criteria
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FiltersPatch {
    /// New search text
    pub search: Option<String>,
    /// New priority predicate
    pub priority: Option<PriorityFilter>,
    /// New completion predicate
    pub completed: Option<CompletionFilter>,
}

impl FiltersPatch {
    /// Set the search text
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the priority predicate
    #[must_use]
    pub fn priority(mut self, priority: impl Into<PriorityFilter>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the completion predicate
    #[must_use]
    pub fn completed(mut self, completed: CompletionFilter) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// Aggregate counts over the whole collection, ignoring filters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    /// Number of todos
    pub total: usize,
    /// Completed todos
    pub completed: usize,
    /// Open todos
    pub incomplete: usize,
    /// High-priority todos
    pub high: usize,
    /// Medium-priority todos
    pub medium: usize,
    /// Low-priority todos
    pub low: usize,
}

impl<'a> FromIterator<&'a Todo> for TodoStats {
    fn from_iter<I: IntoIterator<Item = &'a Todo>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut stats, todo| {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
            } else {
                stats.incomplete += 1;
            }
            match todo.priority {
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }
            stats
        })
    }
}

/// State of the task list
///
/// The collection's array position and `order` stay aligned: every operation
/// that removes or moves todos renumbers them densely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoState {
    /// All todos, in collection order
    pub todos: Vec<Todo>,
    /// Active view criteria
    pub filters: TodoFilters,
    /// Why the last action was rejected, if it was
    pub last_error: Option<TodoError>,
}

impl TodoState {
    /// State holding previously loaded todos and default filters
    #[must_use]
    pub fn new(todos: Vec<Todo>) -> Self {
        Self {
            todos,
            ..Self::default()
        }
    }

    /// Returns a todo by ID
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| &todo.id == id)
    }

    /// Collection position of a todo
    #[must_use]
    pub fn position(&self, id: &TodoId) -> Option<usize> {
        self.todos.iter().position(|todo| &todo.id == id)
    }

    /// Todos passing the active filters, in collection order
    #[must_use]
    pub fn filtered_todos(&self) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|todo| self.filters.matches(todo))
            .collect()
    }

    /// Filtered todos, incomplete before completed, then by ascending `order`
    #[must_use]
    pub fn sorted_todos(&self) -> Vec<&Todo> {
        let mut sorted = self.filtered_todos();
        sorted.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| a.order.cmp(&b.order))
        });
        sorted
    }

    /// Counts over every todo, regardless of filters
    #[must_use]
    pub fn stats(&self) -> TodoStats {
        self.todos.iter().collect()
    }

    /// Reassign `order` as `0..N` following collection order
    pub(crate) fn renumber(&mut self) {
        for (index, todo) in self.todos.iter_mut().enumerate() {
            todo.order = order_at(index);
        }
    }
}
