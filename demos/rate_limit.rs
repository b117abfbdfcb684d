//! Rate Limit Demo
//!
//! Simulates bursts of API calls from a few clients against a fixed window.
//!
//! Run with `cargo run --example rate_limit`.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typed_ttl_store::{Config, RateLimiter, TypedTtlStore};

const API_LIMIT: i64 = 100;
const API_WINDOW_SECS: u64 = 3_600;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typed_ttl_store=info,rate_limit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(TypedTtlStore::from_config(&Config::from_env()));
    let limiter = RateLimiter::new(store, API_LIMIT, API_WINDOW_SECS);

    for (client, calls) in [("198.51.100.4", 20), ("203.0.113.9", 105)] {
        for _ in 0..calls {
            let decision = limiter.check(client)?;
            if !decision.allowed {
                warn!(
                    "{}: rate limit exceeded (X-RateLimit-Limit: {}, X-RateLimit-Reset: {})",
                    client, decision.limit, decision.reset_at
                );
                break;
            }
        }
        info!(
            "{}: X-RateLimit-Remaining: {}",
            client,
            limiter.remaining(client)
        );
    }

    Ok(())
}
