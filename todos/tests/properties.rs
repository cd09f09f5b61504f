//! Property tests for the task-list invariants.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tasklist::{
    CompletionFilter, FiltersPatch, Priority, PriorityFilter, Timestamp, Todo, TodoAction,
    TodoEnvironment, TodoId, TodoReducer, TodoRepository, TodoState,
};
use tasklist_core::reducer::Reducer;
use tasklist_testing::{InMemoryKeyValueStore, SequentialIdGenerator, test_clock};

fn env() -> TodoEnvironment {
    TodoEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIdGenerator::default()),
        TodoRepository::new(Arc::new(InMemoryKeyValueStore::new())),
    )
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)]
}

fn todo() -> impl Strategy<Value = Todo> {
    (
        "[a-z0-9-]{1,12}",
        ".{0,20}",
        any::<bool>(),
        priority(),
        0u32..1000,
        "[0-9T:.Z-]{1,24}",
    )
        .prop_map(|(id, text, completed, priority, order, at)| Todo {
            id: TodoId::new(id),
            text,
            completed,
            priority,
            order,
            created_at: Timestamp::new(at.clone()),
            updated_at: Timestamp::new(at),
        })
}

/// Actions addressing todos by index into a collection of up to `MAX` items
#[derive(Debug, Clone)]
enum Op {
    Create(String, Priority),
    Delete(usize),
    Toggle(usize),
    Reorder(usize, usize),
    ClearCompleted,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => ("[a-z ]{0,8}", priority()).prop_map(|(text, p)| Op::Create(text, p)),
        1 => (0usize..12).prop_map(Op::Delete),
        2 => (0usize..12).prop_map(Op::Toggle),
        2 => (0usize..12, 0usize..12).prop_map(|(from, to)| Op::Reorder(from, to)),
        1 => Just(Op::ClearCompleted),
    ]
}

fn apply(state: &mut TodoState, env: &TodoEnvironment, op: Op, next_id: &mut u32) {
    let id_at = |state: &TodoState, index: usize| {
        state
            .todos
            .get(index)
            .map_or_else(|| TodoId::new("missing"), |todo| todo.id.clone())
    };
    let action = match op {
        Op::Create(text, priority) => {
            *next_id += 1;
            TodoAction::CreateTodo {
                id: TodoId::new(format!("todo-{next_id}")),
                text,
                priority,
            }
        },
        Op::Delete(index) => TodoAction::DeleteTodo {
            id: id_at(state, index),
        },
        Op::Toggle(index) => TodoAction::ToggleTodo {
            id: id_at(state, index),
        },
        Op::Reorder(from_index, to_index) => TodoAction::ReorderTodos {
            from_index,
            to_index,
        },
        Op::ClearCompleted => TodoAction::ClearCompleted,
    };
    TodoReducer.reduce(state, action, env);
}

fn completion_filter() -> impl Strategy<Value = CompletionFilter> {
    prop_oneof![
        Just(CompletionFilter::All),
        Just(CompletionFilter::Completed),
        Just(CompletionFilter::Incomplete),
    ]
}

fn priority_filter() -> impl Strategy<Value = PriorityFilter> {
    prop_oneof![
        Just(PriorityFilter::All),
        priority().prop_map(PriorityFilter::from),
    ]
}

proptest! {
    #[test]
    fn order_stays_dense(ops in prop::collection::vec(op(), 0..40)) {
        let env = env();
        let mut state = TodoState::default();
        let mut next_id = 0;

        for op in ops {
            apply(&mut state, &env, op, &mut next_id);
            let orders: Vec<u32> = state.todos.iter().map(|todo| todo.order).collect();
            let expected: Vec<u32> = (0..).take(state.todos.len()).collect();
            prop_assert_eq!(orders, expected);
        }
    }

    #[test]
    fn filtered_is_conjunction_and_stats_ignore_filters(
        todos in prop::collection::vec(todo(), 0..20),
        search in "[a-zA-Z]{0,2}",
        priority in priority_filter(),
        completed in completion_filter(),
    ) {
        let mut state = TodoState::new(todos);
        state.filters.merge(
            FiltersPatch::default()
                .search(search.clone())
                .priority(priority)
                .completed(completed),
        );

        let filtered = state.filtered_todos();
        let needle = search.to_lowercase();
        let expected: Vec<&Todo> = state
            .todos
            .iter()
            .filter(|todo| {
                todo.text.to_lowercase().contains(&needle)
                    && (priority == PriorityFilter::All
                        || PriorityFilter::from(todo.priority) == priority)
                    && match completed {
                        CompletionFilter::All => true,
                        CompletionFilter::Completed => todo.completed,
                        CompletionFilter::Incomplete => !todo.completed,
                    }
            })
            .collect();
        prop_assert_eq!(filtered, expected);

        let stats = state.stats();
        prop_assert_eq!(stats.total, state.todos.len());
        prop_assert_eq!(stats.completed + stats.incomplete, stats.total);
        prop_assert_eq!(stats.high + stats.medium + stats.low, stats.total);
    }

    #[test]
    fn sorted_puts_incomplete_first_then_order(todos in prop::collection::vec(todo(), 0..20)) {
        let state = TodoState::new(todos);
        let sorted = state.sorted_todos();

        prop_assert_eq!(sorted.len(), state.filtered_todos().len());
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(
                (a.completed, a.order) <= (b.completed, b.order),
                "{:?} sorted before {:?}", a, b
            );
        }
    }

    #[test]
    fn load_after_save_is_identity(todos in prop::collection::vec(todo(), 0..20)) {
        let ids: HashSet<_> = todos.iter().map(|todo| todo.id.clone()).collect();
        prop_assume!(ids.len() == todos.len());

        let repository = TodoRepository::new(Arc::new(InMemoryKeyValueStore::new()));
        let _ = repository.load();
        repository.save(&todos).unwrap();

        prop_assert_eq!(repository.load(), todos);
    }
}
