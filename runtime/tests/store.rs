//! Integration tests for Store execution, persistence and broadcasting

#![allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic

use std::sync::Arc;
use tasklist_core::environment::Persist;
use tasklist_core::storage::{KeyValueStore, StorageError};
use tasklist_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use tasklist_runtime::{Store, StoreError, StoreEvent};
use tasklist_testing::InMemoryKeyValueStore;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum CounterAction {
    Increment,
    /// Changes state but asks for no snapshot
    Peek,
    /// Asks for two snapshots of the same state
    DoubleSave,
    /// Refused by the reducer; state untouched
    Reject,
}

#[derive(Debug, Clone, Default)]
struct CounterState {
    count: u32,
    peeks: u32,
}

/// Writes `count` under the `counter` key
struct RecordingEnvironment {
    storage: Arc<InMemoryKeyValueStore>,
}

impl Persist<CounterState> for RecordingEnvironment {
    fn persist(&self, state: &CounterState) -> Result<(), StorageError> {
        self.storage.set("counter", &state.count.to_string())
    }
}

struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = RecordingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            CounterAction::Increment => {
                state.count += 1;
                smallvec![Effect::Persist]
            },
            CounterAction::Peek => {
                state.peeks += 1;
                smallvec![Effect::None]
            },
            CounterAction::DoubleSave => smallvec![Effect::Persist, Effect::Persist],
            CounterAction::Reject => SmallVec::new(),
        }
    }
}

type CounterStore = Store<CounterState, CounterAction, RecordingEnvironment, CounterReducer>;

fn counter_store() -> (Arc<InMemoryKeyValueStore>, CounterStore) {
    let storage = Arc::new(InMemoryKeyValueStore::new());
    let store = Store::new(
        CounterState::default(),
        CounterReducer,
        RecordingEnvironment {
            storage: storage.clone(),
        },
    );
    (storage, store)
}

fn written_values(storage: &InMemoryKeyValueStore) -> Vec<String> {
    storage.writes().into_iter().map(|(_, value)| value).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn persist_runs_before_send_returns() {
    let (storage, store) = counter_store();

    let committed = store.send(CounterAction::Increment).await;

    assert!(committed.is_durable());
    assert_eq!(committed.revision, 1);
    assert_eq!(storage.raw("counter").as_deref(), Some("1"));
}

#[tokio::test]
async fn snapshots_follow_action_order() {
    let (storage, store) = counter_store();

    for _ in 0..5 {
        let _ = store.send(CounterAction::Increment).await;
    }

    assert_eq!(written_values(&storage), ["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn concurrent_senders_never_reorder_snapshots() {
    let (storage, store) = counter_store();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.send(CounterAction::Increment).await.revision })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let expected: Vec<String> = (1..=20).map(|n: u32| n.to_string()).collect();
    assert_eq!(written_values(&storage), expected);
    assert_eq!(store.revision(), 20);
}

#[tokio::test]
async fn no_persist_effect_means_no_write() {
    let (storage, store) = counter_store();

    let committed = store
        .send_and_read(CounterAction::Peek, |state| state.peeks)
        .await;

    assert_eq!(committed.into_value(), 1);
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn every_persist_effect_is_executed() {
    let (storage, store) = counter_store();

    let _ = store.send(CounterAction::DoubleSave).await;

    assert_eq!(written_values(&storage), ["0", "0"]);
}

#[tokio::test]
async fn failed_persist_keeps_state_and_reports() {
    let (storage, store) = counter_store();
    let mut events = store.subscribe();
    storage.fail_writes(true);

    let committed = store
        .send_and_read(CounterAction::Increment, |state| state.count)
        .await;

    assert!(!committed.is_durable());
    assert_eq!(committed.value, 1);
    assert_eq!(store.state(|state| state.count).await, 1);
    assert!(matches!(
        committed.into_result(),
        Err(StoreError::Persistence(_))
    ));

    match events.recv().await.unwrap() {
        StoreEvent::PersistFailed { revision, error } => {
            assert_eq!(revision, 1);
            assert!(error.to_string().contains("quota exceeded"));
        },
        other => panic!("expected PersistFailed, got {other:?}"),
    }
    assert!(matches!(
        events.recv().await.unwrap(),
        StoreEvent::Changed { revision: 1 }
    ));
}

#[tokio::test]
async fn accepted_actions_publish_changed() {
    let (_storage, store) = counter_store();
    let mut events = store.subscribe();

    let _ = store.send(CounterAction::Increment).await;
    let _ = store.send(CounterAction::Peek).await;

    for expected in [1, 2] {
        match events.recv().await.unwrap() {
            StoreEvent::Changed { revision } => assert_eq!(revision, expected),
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn rejected_action_keeps_revision_and_publishes_nothing() {
    let (storage, store) = counter_store();
    let _ = store.send(CounterAction::Increment).await;
    let mut events = store.subscribe();

    let committed = store
        .send_and_read(CounterAction::Reject, |state| state.count)
        .await;

    assert_eq!(committed.revision, 1);
    assert!(committed.is_durable());
    assert_eq!(committed.value, 1);
    assert_eq!(store.revision(), 1);
    assert_eq!(storage.write_count(), 1);
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    let _ = store.send(CounterAction::Increment).await;
    assert!(matches!(
        events.recv().await.unwrap(),
        StoreEvent::Changed { revision: 2 }
    ));
}

#[tokio::test]
async fn sending_without_subscribers_is_fine() {
    let (_storage, store) = counter_store();
    let committed = store.send(CounterAction::Increment).await;
    assert!(committed.is_durable());
}

#[test]
fn store_works_on_a_blocking_executor() {
    let (storage, store) = counter_store();

    let committed = tokio_test::block_on(store.send(CounterAction::Increment));
    let count = tokio_test::block_on(store.state(|state| state.count));

    assert!(committed.is_durable());
    assert_eq!(count, 1);
    assert_eq!(storage.write_count(), 1);
}
