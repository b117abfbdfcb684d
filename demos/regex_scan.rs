//! Regex Scan Demo
//!
//! Seeds the store with generated keys, then counts and deletes them by pattern.
//!
//! Run with `cargo run --example regex_scan`.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typed_ttl_store::{Config, TypedTtlStore};

const PATTERN: &str = "/^myvar_(.*)$/";

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typed_ttl_store=info,regex_scan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = TypedTtlStore::from_config(&Config::from_env());

    // 100 non-expiring keys plus a few that must survive the delete
    for i in 0..100_i64 {
        store.store(&format!("myvar_{:04x}", i * 7919), i * 97 % 10_000, 0, false)?;
    }
    for name in ["config", "session_1", "not_myvar_1"] {
        store.store(name, name, 0, false)?;
    }

    let matched = store.search_by_pattern(PATTERN, false)?;
    info!("{} keys were matched", matched.len());

    let deleted = store.delete_by_pattern(PATTERN)?;
    info!("{} keys were matched and deleted", deleted);
    info!("{} keys remain", store.len());

    Ok(())
}
