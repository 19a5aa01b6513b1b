use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vigil_dns_application::use_cases::FlushQueryLogUseCase;

/// Periodically writes dirty queries to the mem database and, at a coarser
/// cadence, mirrors the backlog into the long-term database.
pub struct QueryFlushJob {
    flush: Arc<FlushQueryLogUseCase>,
    mem_interval: Duration,
    disk_interval: Duration,
    cancel: CancellationToken,
}

impl QueryFlushJob {
    pub fn new(flush: Arc<FlushQueryLogUseCase>, mem_interval_secs: u64, disk_interval_secs: u64) -> Self {
        Self {
            flush,
            mem_interval: Duration::from_secs(mem_interval_secs.max(1)),
            disk_interval: Duration::from_secs(disk_interval_secs.max(1)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            mem_interval = self.mem_interval.as_secs(),
            disk_interval = self.disk_interval.as_secs(),
            "Starting query flush job"
        );
        tokio::spawn(async move { self.run().await });
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.mem_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut since_disk = Duration::ZERO;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            since_disk += self.mem_interval;
            let mirror = since_disk >= self.disk_interval;
            if mirror {
                since_disk = Duration::ZERO;
            }

            if let Err(e) = self.flush.execute(mirror).await {
                warn!(error = %e, "Query flush failed");
            }
        }

        // Final drain so a clean shutdown loses nothing.
        if let Err(e) = self.flush.execute(true).await {
            warn!(error = %e, "Final query flush failed");
        }
        info!("Query flush job stopped");
    }
}
