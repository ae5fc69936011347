//! Expiry Policy and Background Sweeper
//!
//! The policy itself is pure: given an entry and the current time, decide
//! whether it is live. TTLs are supplied by callers as a relative number of
//! seconds at write time and converted to an absolute epoch-millisecond
//! deadline exactly once, here. A TTL of `0` is the sentinel for "never
//! expires" and maps to no deadline at all, never to "expires now".
//!
//! ## Lazy + Active Expiry
//!
//! Expired entries are reclaimed in two ways:
//! 1. **Lazy**: every read/delete checks liveness and evicts a stale entry
//!    as part of the access. This is the path correctness depends on.
//! 2. **Active**: a low-priority background task periodically sweeps the
//!    table so entries that are never touched again do not accumulate.
//!    The sweeper only matters for memory footprint, never for semantics.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::storage::table::{Entry, EntryTable};

/// Current wall-clock time as Unix-epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}

/// Converts a relative TTL in seconds to an absolute deadline.
///
/// `0` is the "never expires" sentinel and yields `None`; it must not be
/// read as a deadline of `now`.
pub fn expires_at(ttl_seconds: u64, now: u64) -> Option<u64> {
    if ttl_seconds == 0 {
        None
    } else {
        Some(now.saturating_add(ttl_seconds.saturating_mul(1000)))
    }
}

/// Returns whether `entry` is live at time `now`.
///
/// An entry with no deadline is always live; otherwise it is live strictly
/// before its deadline (`now == expires_at` counts as expired).
pub fn is_live(entry: &Entry, now: u64) -> bool {
    match entry.expires_at {
        None => true,
        Some(deadline) => now < deadline,
    }
}

/// Configuration for the background sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between sweeps (default: 30s).
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// A handle to the running sweeper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl Sweeper {
    /// Starts the sweeper as a background task over `table`.
    pub fn start(table: Arc<EntryTable>, config: SweeperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(table, config, shutdown_rx));

        info!("background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper. Called automatically on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    table: Arc<EntryTable>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let evicted = table.evict_expired(now_millis());
        if evicted > 0 {
            debug!(
                evicted = evicted,
                keys_remaining = table.len(),
                "expired entries swept"
            );
        }
    }
}

/// Starts the sweeper with default configuration.
pub fn start_sweeper(table: Arc<EntryTable>) -> Sweeper {
    Sweeper::start(table, SweeperConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_is_never_expires() {
        assert_eq!(expires_at(0, 1_000_000), None);
    }

    #[test]
    fn test_ttl_converted_to_absolute_deadline() {
        assert_eq!(expires_at(5, 1_000_000), Some(1_005_000));
    }

    #[test]
    fn test_entry_without_deadline_is_always_live() {
        let entry = Entry::new("v");
        assert!(is_live(&entry, 0));
        assert!(is_live(&entry, u64::MAX));
    }

    #[test]
    fn test_liveness_boundary() {
        let entry = Entry::with_deadline("v", 1_005_000);

        assert!(is_live(&entry, 1_004_999));
        // The deadline itself counts as expired.
        assert!(!is_live(&entry, 1_005_000));
        assert!(!is_live(&entry, 1_005_001));
    }

    #[tokio::test]
    async fn test_sweeper_evicts_expired_entries() {
        let table = Arc::new(EntryTable::new());
        let now = now_millis();

        for i in 0..10 {
            table.put(format!("dead-{}", i), Entry::with_deadline("v", now - 1));
        }
        table.put("persistent", Entry::new("v"));
        assert_eq!(table.len(), 11);

        let config = SweeperConfig {
            interval: Duration::from_millis(10),
        };
        let _sweeper = Sweeper::start(Arc::clone(&table), config);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(table.len(), 1);
        assert!(table.contains_key("persistent"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let table = Arc::new(EntryTable::new());

        {
            let _sweeper = Sweeper::start(
                Arc::clone(&table),
                SweeperConfig {
                    interval: Duration::from_millis(10),
                },
            );
            tokio::time::sleep(Duration::from_millis(30)).await;
            // Sweeper dropped here.
        }

        table.put("stale", Entry::with_deadline("v", now_millis() - 1));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Nothing swept it; only a lazy access would evict it now.
        assert!(table.contains_key("stale"));
    }
}
