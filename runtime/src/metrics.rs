//! Metric names and descriptions for the Store runtime.
//!
//! The runtime only records through the `metrics` facade. Installing a
//! recorder (Prometheus, statsd, ...) is left to the host application.

use metrics::{Unit, describe_counter, describe_gauge};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge};

/// Actions run through a reducer
pub const ACTIONS_PROCESSED: &str = "store.actions.processed";

/// Snapshots written successfully
pub const PERSIST_SUCCEEDED: &str = "store.persist.succeeded";

/// Snapshots the environment failed to write
pub const PERSIST_FAILED: &str = "store.persist.failed";

/// Revision of the most recently committed state
pub const STATE_REVISION: &str = "store.state.revision";

/// Register descriptions for every runtime metric.
///
/// Call once after installing a recorder so exporters can publish help text.
pub fn register_metrics() {
    describe_counter!(
        ACTIONS_PROCESSED,
        Unit::Count,
        "Number of actions processed by the store"
    );
    describe_counter!(
        PERSIST_SUCCEEDED,
        Unit::Count,
        "Number of state snapshots persisted"
    );
    describe_counter!(
        PERSIST_FAILED,
        Unit::Count,
        "Number of state snapshots that failed to persist"
    );
    describe_gauge!(
        STATE_REVISION,
        Unit::Count,
        "Revision of the most recently committed state"
    );
}
