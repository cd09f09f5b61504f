//! Task list demo binary
//!
//! Opens the file-backed store from the configured data directory and walks
//! through the operation set, printing the sorted view after each step.

use anyhow::Context;
use std::sync::Arc;
use tasklist::{
    CompletionFilter, Config, FileKeyValueStore, FiltersPatch, Priority, SystemPreference,
    ThemeController, TodoEnvironment, TodoStore, parse_text,
};
use tasklist_runtime::StoreEvent;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env().context("invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    tasklist_runtime::metrics::register_metrics();

    println!("=== Task List ===\n");

    let storage = Arc::new(
        FileKeyValueStore::open(&config.data_dir)
            .with_context(|| format!("cannot open {}", config.data_dir.display()))?,
    );
    let store = TodoStore::open_with_broadcast_capacity(
        TodoEnvironment::production(storage.clone(), config.storage_key.clone()),
        config.broadcast_capacity,
    );

    let mut events = store.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let StoreEvent::PersistFailed { revision, error } = event {
                eprintln!("warning: change {revision} was not saved: {error}");
            }
        }
    });

    let theme = ThemeController::load(storage, config.theme_key.clone(), SystemPreference::new(false));
    let _theme_subscription = theme.activate();
    println!("Theme: {} (dark: {})", theme.mode(), theme.is_dark());

    println!("Loaded {} todos", store.todos().await.len());
    print_sorted(&store).await;

    println!("\n>>> Creating todos");
    let milk = store
        .create_todo(&parse_text("  Buy milk ")?, Priority::High)
        .await?;
    let dog = store.create_todo(&parse_text("Walk dog")?, Priority::Low).await?;
    let docs = store
        .create_todo(&parse_text("Write docs")?, Priority::Medium)
        .await?;
    if let Err(error) = parse_text("   ") {
        println!("Skipped blank todo: {error}");
    }
    print_sorted(&store).await;

    println!("\n>>> Completing '{}'", milk.text);
    store.toggle_todo(&milk.id).await;
    print_sorted(&store).await;

    println!("\n>>> Moving '{}' to the top", docs.text);
    let from = store
        .todos()
        .await
        .iter()
        .position(|todo| todo.id == docs.id)
        .context("todo disappeared")?;
    store.reorder_todos(from, 0).await?;
    print_sorted(&store).await;

    println!("\n>>> Showing incomplete todos matching 'w'");
    store
        .set_filters(
            FiltersPatch::default()
                .search("w")
                .completed(CompletionFilter::Incomplete),
        )
        .await;
    print_sorted(&store).await;
    store.reset_filters().await;

    let stats = store.stats().await;
    println!(
        "\nStats: {} total, {} completed, {} open (high {}, medium {}, low {})",
        stats.total, stats.completed, stats.incomplete, stats.high, stats.medium, stats.low
    );

    println!("\n>>> Clearing completed and removing '{}'", dog.text);
    store.clear_completed().await;
    store.delete_todo(&dog.id).await;
    print_sorted(&store).await;

    theme.toggle().context("cannot save theme")?;
    println!("\nTheme: {} (dark: {})", theme.mode(), theme.is_dark());

    if let Some(error) = store.take_persist_error() {
        anyhow::bail!("some changes were not saved: {error}");
    }

    println!("\nSaved to {}", config.data_dir.display());
    Ok(())
}

async fn print_sorted(store: &TodoStore) {
    for todo in store.sorted_todos().await {
        let status = if todo.completed { "✓" } else { " " };
        println!("  [{status}] {:<20} {:<6} #{}", todo.text, todo.priority.as_str(), todo.order);
    }
}
