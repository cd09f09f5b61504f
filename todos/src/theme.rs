//! Light/dark theme preference.
//!
//! Independent of the task list: the mode is stored under its own key and
//! never touches the todo blob. The operating-system preference is modelled
//! as a [`SystemPreference`] that a host updates; a [`ThemeController`]
//! follows it only while an explicit [`ThemeSubscription`] is alive.

use crate::types::TodoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tasklist_core::storage::{KeyValueStore, StorageError};

/// Key the theme mode is stored under unless configured otherwise
pub const DEFAULT_THEME_KEY: &str = "themeMode";

/// User's theme choice
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Always light
    Light,
    /// Always dark
    Dark,
    /// Follow the operating system
    #[default]
    System,
}

impl ThemeMode {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// Whether this mode renders dark, given the system preference
    #[must_use]
    pub const fn resolve(self, system_dark: bool) -> bool {
        match self {
            Self::Light => false,
            Self::Dark => true,
            Self::System => system_dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(TodoError::UnknownValue(s.to_string())),
        }
    }
}

/// Handle identifying one registered preference listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct PreferenceInner {
    dark: AtomicBool,
    next_listener: AtomicU64,
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
}

/// Operating-system dark-mode preference
///
/// Cloning shares the same preference. Listeners are called synchronously,
/// in registration order, by [`set_dark`](Self::set_dark) when the value
/// actually changes.
#[derive(Clone, Default)]
pub struct SystemPreference {
    inner: Arc<PreferenceInner>,
}

impl SystemPreference {
    /// Preference starting at `dark`
    #[must_use]
    pub fn new(dark: bool) -> Self {
        let preference = Self::default();
        preference.inner.dark.store(dark, Ordering::SeqCst);
        preference
    }

    /// Whether the system currently prefers dark
    #[must_use]
    pub fn prefers_dark(&self) -> bool {
        self.inner.dark.load(Ordering::SeqCst)
    }

    /// Report a new system preference
    pub fn set_dark(&self, dark: bool) {
        if self.inner.dark.swap(dark, Ordering::SeqCst) == dark {
            return;
        }
        tracing::debug!(dark, "System theme preference changed");

        // Listeners may subscribe or unsubscribe, so call them unlocked.
        let listeners: Vec<Listener> = self.listeners().values().cloned().collect();
        for listener in listeners {
            listener(dark);
        }
    }

    /// Register a listener for preference changes
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners().insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener; `false` if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners().remove(&id).is_some()
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    fn listeners(&self) -> MutexGuard<'_, BTreeMap<ListenerId, Listener>> {
        lock(&self.inner.listeners)
    }
}

impl fmt::Debug for SystemPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPreference")
            .field("dark", &self.prefers_dark())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct ThemeState {
    mode: ThemeMode,
    is_dark: bool,
}

/// Owns the theme mode and the resolved dark flag
///
/// Every mode change is written to storage. A failed write keeps the new
/// mode in memory and is returned to the caller.
pub struct ThemeController {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    system: SystemPreference,
    state: Arc<Mutex<ThemeState>>,
}

impl ThemeController {
    /// Restore the stored mode; missing or unrecognised values mean
    /// [`ThemeMode::System`]
    #[must_use]
    pub fn load(
        storage: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        system: SystemPreference,
    ) -> Self {
        let key = key.into();
        let mode = match storage.get(&key) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|error| {
                tracing::warn!(key = %key, error = %error, "Ignoring stored theme mode");
                ThemeMode::default()
            }),
            Ok(None) => ThemeMode::default(),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "Failed to read theme mode");
                ThemeMode::default()
            },
        };
        let is_dark = mode.resolve(system.prefers_dark());

        Self {
            storage,
            key,
            system,
            state: Arc::new(Mutex::new(ThemeState { mode, is_dark })),
        }
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> ThemeMode {
        lock(&self.state).mode
    }

    /// Whether the theme currently renders dark
    #[must_use]
    pub fn is_dark(&self) -> bool {
        lock(&self.state).is_dark
    }

    /// Switch to `mode` and store it
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the mode could not be stored.
    pub fn set_mode(&self, mode: ThemeMode) -> Result<(), StorageError> {
        {
            let mut state = lock(&self.state);
            state.mode = mode;
            state.is_dark = mode.resolve(self.system.prefers_dark());
        }
        tracing::debug!(%mode, "Theme mode set");
        self.storage.set(&self.key, mode.as_str())
    }

    /// Force light or dark
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the mode could not be stored.
    pub fn set_dark(&self, dark: bool) -> Result<(), StorageError> {
        self.set_mode(if dark { ThemeMode::Dark } else { ThemeMode::Light })
    }

    /// Flip between light and dark
    ///
    /// From [`ThemeMode::System`] this picks the opposite of the current
    /// system preference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the mode could not be stored.
    pub fn toggle(&self) -> Result<(), StorageError> {
        let next = match self.mode() {
            ThemeMode::System if self.system.prefers_dark() => ThemeMode::Light,
            ThemeMode::System | ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        };
        self.set_mode(next)
    }

    /// Start following system preference changes
    ///
    /// The returned guard stops following when dropped or passed to
    /// [`deactivate`](Self::deactivate). Changes only affect `is_dark` while
    /// the mode is [`ThemeMode::System`].
    #[must_use = "dropping the subscription stops following the system preference"]
    pub fn activate(&self) -> ThemeSubscription {
        let state = Arc::clone(&self.state);
        let id = self.system.subscribe(move |dark| {
            let mut state = lock(&state);
            if state.mode == ThemeMode::System {
                state.is_dark = dark;
            }
        });
        tracing::debug!(?id, "Following system theme preference");

        ThemeSubscription {
            system: self.system.clone(),
            id: Some(id),
        }
    }

    /// Stop following system preference changes
    #[allow(clippy::unused_self)]
    pub fn deactivate(&self, subscription: ThemeSubscription) {
        drop(subscription);
    }
}

impl fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *lock(&self.state);
        f.debug_struct("ThemeController")
            .field("key", &self.key)
            .field("mode", &state.mode)
            .field("is_dark", &state.is_dark)
            .finish_non_exhaustive()
    }
}

/// Live system-preference listener; released on drop
#[derive(Debug)]
pub struct ThemeSubscription {
    system: SystemPreference,
    id: Option<ListenerId>,
}

impl Drop for ThemeSubscription {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.system.unsubscribe(id);
            tracing::debug!(?id, "Stopped following system theme preference");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
