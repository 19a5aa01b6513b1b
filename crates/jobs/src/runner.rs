use crate::{Housekeeper, QueryFlushJob};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builder that wires the background tasks to one shutdown token and starts
/// them together.
pub struct JobRunner {
    housekeeper: Option<Housekeeper>,
    query_flush: Option<QueryFlushJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            housekeeper: None,
            query_flush: None,
            shutdown: None,
        }
    }

    pub fn with_housekeeper(mut self, job: Housekeeper) -> Self {
        self.housekeeper = Some(job);
        self
    }

    pub fn with_query_flush(mut self, job: QueryFlushJob) -> Self {
        self.query_flush = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub async fn start(self) {
        info!("Starting background jobs");

        if let Some(job) = self.housekeeper {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        if let Some(job) = self.query_flush {
            let job = match &self.shutdown {
                Some(token) => job.with_cancellation(token.clone()),
                None => job,
            };
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
