//! Cache Janitor Task
//!
//! Staged cleanup for a store: reap expired entries, then purge unpopular
//! entries while free capacity stays below a threshold, and optionally clear
//! the store as a last resort.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TypedTtlStore;

// == Janitor Policy ==
/// When and how aggressively the janitor cleans.
#[derive(Debug, Clone, PartialEq)]
pub struct JanitorPolicy {
    /// Delay between passes
    pub interval: Duration,
    /// Free capacity (percent) below which the purge stage runs
    pub min_free_percent: f64,
    /// Entries fetched fewer times than this are purged
    pub min_hits: u64,
    /// Clear the whole store if purging did not free enough capacity
    pub clear_as_last_resort: bool,
}

impl Default for JanitorPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            min_free_percent: 20.0,
            min_hits: 10,
            clear_as_last_resort: false,
        }
    }
}

// == Janitor Report ==
/// What a single pass removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JanitorReport {
    pub reaped: usize,
    pub purged: usize,
    pub cleared: usize,
    /// Free capacity percentage after the pass
    pub free_percent: f64,
}

impl JanitorReport {
    /// Total entries removed by the pass.
    pub fn total_removed(&self) -> usize {
        self.reaped + self.purged + self.cleared
    }
}

/// Runs one cleanup pass.
///
/// Expired entries are always reaped. The purge stage runs only while free
/// capacity is below `min_free_percent`, and the clear stage only if the
/// purge was not enough and the policy allows it.
pub fn run_janitor_pass(store: &TypedTtlStore, policy: &JanitorPolicy) -> JanitorReport {
    let mut report = JanitorReport {
        reaped: store.reap_expired(),
        ..JanitorReport::default()
    };

    if store.capacity_free_ratio() < policy.min_free_percent {
        report.purged = store.purge_unpopular(policy.min_hits);
    }

    if policy.clear_as_last_resort && store.capacity_free_ratio() < policy.min_free_percent {
        warn!("Janitor: capacity still low after purge, clearing store");
        report.cleared = store.clear();
    }

    report.free_percent = store.capacity_free_ratio();
    report
}

/// Spawns a background task that runs a janitor pass every `policy.interval`.
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop the janitor.
///
/// # Example
/// ```ignore
/// let store = Arc::new(TypedTtlStore::new(10_000));
/// let handle = spawn_janitor_task(store.clone(), JanitorPolicy::default());
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_janitor_task(store: Arc<TypedTtlStore>, policy: JanitorPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache janitor with interval of {:?}, min free {}%, min hits {}",
            policy.interval, policy.min_free_percent, policy.min_hits
        );

        loop {
            tokio::time::sleep(policy.interval).await;

            let report = run_janitor_pass(&store, &policy);

            if report.total_removed() > 0 {
                info!(
                    "Janitor: reaped {}, purged {}, cleared {}; {}% free",
                    report.reaped, report.purged, report.cleared, report.free_percent
                );
            } else {
                debug!("Janitor: nothing to remove; {}% free", report.free_percent);
            }
        }
    })
}
