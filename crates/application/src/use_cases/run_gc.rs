use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};
use vigil_dns_domain::{Config, DomainError};

use crate::core::Core;
use crate::ports::QueryHistoryRepository;

/// Cadence of full garbage-collection runs; mintime is aligned to it so the
/// cut matches the overtime slot grid.
pub const GC_INTERVAL_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, Default)]
pub struct GcOutcome {
    pub removed: usize,
    pub mem_deleted: u64,
    pub disk_deleted: u64,
}

/// One garbage-collection pass: age queries out of the engine, trim the mem
/// database, optionally trim the long-term database, then compact.
///
/// The in-memory teardown and the compaction run under the engine lock; the
/// database deletes run between them with the lock released.
pub struct RunGarbageCollectionUseCase {
    core: Arc<Core>,
    history: Arc<dyn QueryHistoryRepository>,
    config: Arc<ArcSwap<Config>>,
}

impl RunGarbageCollectionUseCase {
    pub fn new(
        core: Arc<Core>,
        history: Arc<dyn QueryHistoryRepository>,
        config: Arc<ArcSwap<Config>>,
    ) -> Self {
        Self {
            core,
            history,
            config,
        }
    }

    pub fn mintime(&self, now: i64) -> i64 {
        let mut mintime = now - self.config.load().api.max_history as i64;
        mintime -= mintime.rem_euclid(GC_INTERVAL_SECS);
        mintime
    }

    pub async fn execute(&self, now: i64, trim_disk: bool) -> Result<GcOutcome, DomainError> {
        let cfg = self.config.load();
        let mintime = self.mintime(now);

        let removed = self.core.gc_teardown(mintime);

        let mem_deleted = self.history.delete_older_than_mem(mintime as f64).await?;

        let mut disk_deleted = 0;
        if trim_disk && cfg.database.max_db_days > 0 {
            let disk_mintime = now - cfg.database.max_db_days as i64 * 86400;
            disk_deleted = self
                .history
                .delete_older_than_disk(disk_mintime as f64)
                .await?;
        }

        self.core.gc_compact(mintime, removed);

        if removed > 0 {
            info!(removed, mem_deleted, disk_deleted, "Garbage collection finished");
        } else {
            debug!(mintime, "Garbage collection found nothing to remove");
        }

        Ok(GcOutcome {
            removed,
            mem_deleted,
            disk_deleted,
        })
    }
}
