//! Expiration Sweeper
//!
//! Background task that periodically reclaims cache locations whose expiry in
//! the expiration index has passed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_secs, CacheEngine, CacheLocation, RemoteTier, HIT_COUNT_KEY};
use crate::error::Result;

/// Sorted set members fetched per page while clearing hashmap fields.
pub const SWEEP_BATCH: usize = 100;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Index members whose expiry had passed
    pub expired: usize,
    /// Locations fully reclaimed and removed from the index
    pub reclaimed: usize,
    /// Members that could not be parsed; left in the index
    pub malformed: usize,
    /// Locations that hit a store error; retried next pass
    pub failed: usize,
}

// == Sweeper ==
/// Reclaims expired cache locations from the remote tier.
pub struct Sweeper {
    engine: Arc<CacheEngine>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(engine: Arc<CacheEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs one pass over every index member with a score in `0..=now`.
    ///
    /// Fails only when the index itself cannot be read. Per-location errors
    /// are logged and counted; the location stays in the index because its
    /// member is removed last.
    pub async fn sweep_once(&self, now: i64) -> Result<SweepReport> {
        let remote = self.engine.tiers().remote();
        let expired = remote.expired_members(now).await?;

        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };

        for member in &expired {
            let location = match CacheLocation::from_member(member) {
                Ok(location) => location,
                Err(e) => {
                    warn!(member = %member, error = %e, "Skipping malformed expiration entry");
                    report.malformed += 1;
                    continue;
                }
            };

            match reclaim(remote.as_ref(), member, &location).await {
                Ok(fields) => {
                    debug!(
                        sort_set = %location.sort_set,
                        hashmap = %location.hashmap,
                        fields,
                        "Reclaimed cache location"
                    );
                    report.reclaimed += 1;
                }
                Err(e) => {
                    warn!(
                        sort_set = %location.sort_set,
                        hashmap = %location.hashmap,
                        error = %e,
                        "Failed to reclaim cache location, will retry"
                    );
                    report.failed += 1;
                }
            }
        }

        self.engine.stats().record_reclaimed(report.reclaimed as u64);
        Ok(report)
    }

    /// Starts the sweep loop on the runtime.
    ///
    /// The first pass runs one interval after start. The returned handle stops
    /// and joins the task.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let join = tokio::spawn(async move {
            info!(
                "Starting expiration sweeper with interval of {} seconds",
                self.interval.as_secs_f64()
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Expiration sweeper received shutdown signal");
                        break;
                    }

                    _ = ticker.tick() => {
                        match self.sweep_once(current_timestamp_secs()).await {
                            Ok(report) if report.expired > 0 => info!(
                                expired = report.expired,
                                reclaimed = report.reclaimed,
                                malformed = report.malformed,
                                failed = report.failed,
                                "Expiration sweep finished"
                            ),
                            Ok(_) => debug!("Expiration sweep: nothing expired"),
                            Err(e) => warn!(error = %e, "Failed to read expiration index"),
                        }
                    }
                }
            }

            info!("Expiration sweeper stopped");
        });

        SweeperHandle { shutdown_tx, join }
    }
}

/// Clears one location: hashmap fields referenced by the sorted set (in
/// batches), the hit-count field, the sorted set, then the index member.
/// Returns the number of hashmap fields deleted.
async fn reclaim(remote: &dyn RemoteTier, member: &str, location: &CacheLocation) -> Result<usize> {
    // Ranks stay stable while paging: the sorted set is only deleted after this loop.
    let mut offset = 0;
    loop {
        let batch = remote
            .sorted_page(&location.sort_set, offset, SWEEP_BATCH)
            .await?;
        if !batch.is_empty() {
            remote.hdel(&location.hashmap, &batch).await?;
        }
        offset += batch.len();
        if batch.len() < SWEEP_BATCH {
            break;
        }
    }

    remote
        .hdel(HIT_COUNT_KEY, std::slice::from_ref(&location.sort_set))
        .await?;
    remote.del(&location.sort_set).await?;
    remote.remove_expiration(member).await?;
    Ok(offset)
}

/// Spawns the sweeper for `engine`, ticking every `interval`.
pub fn spawn_sweeper(engine: Arc<CacheEngine>, interval: Duration) -> SweeperHandle {
    Sweeper::new(engine, interval).spawn()
}

// == Sweeper Handle ==
/// Owner of the running sweep task.
pub struct SweeperHandle {
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the task to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "Expiration sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
