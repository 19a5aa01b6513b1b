use std::sync::Arc;

use tracing::{debug, warn};
use vigil_dns_domain::DomainError;

use crate::core::Core;
use crate::ports::QueryHistoryRepository;

/// Periodic flush of dirty queries into the mem database, with a coarser
/// mirroring pass into the long-term database. A failed flush raises the
/// engine's busy flag, which routes fresh queries to the DBBUSY verdict
/// until a flush succeeds again.
pub struct FlushQueryLogUseCase {
    core: Arc<Core>,
    history: Arc<dyn QueryHistoryRepository>,
}

impl FlushQueryLogUseCase {
    pub fn new(core: Arc<Core>, history: Arc<dyn QueryHistoryRepository>) -> Self {
        Self { core, history }
    }

    pub async fn execute(&self, mirror_disk: bool) -> Result<(u64, u64), DomainError> {
        let rows = self.core.drain_dirty();

        let mut stored = 0;
        if !rows.is_empty() {
            match self.history.store_queries(&rows).await {
                Ok(n) => {
                    stored = n;
                    self.core.set_db_busy(false);
                }
                Err(e) => {
                    self.core.set_db_busy(true);
                    warn!(error = %e, rows = rows.len(), "Query flush failed, raising busy flag");
                    return Err(e);
                }
            }
        } else if self.core.is_db_busy() {
            // Nothing pending; probe the database so the flag can clear.
            if self.history.counts().await.is_ok() {
                self.core.set_db_busy(false);
            }
        }

        let mut mirrored = 0;
        if mirror_disk {
            mirrored = self.history.mirror_to_disk().await?;
            if mirrored > 0 {
                debug!(mirrored, "Mirrored queries to the long-term database");
            }
        }

        Ok((stored, mirrored))
    }
}
