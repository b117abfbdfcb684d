//! Cache Janitor Demo
//!
//! Fills a small store with short-lived and rarely read entries, then lets the
//! background janitor reclaim capacity until Ctrl+C.
//!
//! Run with `cargo run --example cache_janitor`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typed_ttl_store::{spawn_janitor_task, Config, TypedTtlStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typed_ttl_store=info,cache_janitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config {
        max_entries: 1_000,
        cleanup_interval: 1,
        ..Config::from_env()
    };
    info!(
        "Configuration loaded: max_entries={}, cleanup_interval={}s, min_free={}%, min_hits={}",
        config.max_entries, config.cleanup_interval, config.min_free_percent, config.min_hits
    );

    let store = Arc::new(TypedTtlStore::from_config(&config));
    for i in 0..600 {
        store.store(&format!("page_{}", i), format!("<html>{}</html>", i), 2, false)?;
    }
    for i in 0..350 {
        store.store(&format!("user_{}", i), i, 0, false)?;
    }
    for _ in 0..config.min_hits {
        store.fetch("user_0")?;
    }
    info!("Free capacity before cleanup: {}%", store.capacity_free_ratio());

    let handle = spawn_janitor_task(store.clone(), config.janitor_policy());

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    handle.abort();
    info!(
        "Free capacity after cleanup: {}% ({} entries, stats: {:?})",
        store.capacity_free_ratio(),
        store.len(),
        store.stats()
    );
    Ok(())
}
