use std::sync::Arc;

use arc_swap::ArcSwap;
use vigil_dns_domain::config::PrivacyLevel;
use vigil_dns_domain::{Config, DomainError};

use crate::ports::{QueryHistoryRepository, QueryLogFilters, QueryLogPage};

/// Filtered, cursor-paginated read of the query log from the mirror.
pub struct GetQueryLogUseCase {
    history: Arc<dyn QueryHistoryRepository>,
    config: Arc<ArcSwap<Config>>,
}

impl GetQueryLogUseCase {
    pub fn new(history: Arc<dyn QueryHistoryRepository>, config: Arc<ArcSwap<Config>>) -> Self {
        Self { history, config }
    }

    pub async fn execute(&self, filters: QueryLogFilters) -> Result<QueryLogPage, DomainError> {
        // At maximum privacy the log is not even consulted.
        if self.config.load().api.privacy_level >= PrivacyLevel::Maximum {
            return Ok(QueryLogPage {
                queries: Vec::new(),
                cursor: None,
                records_total: 0,
                records_filtered: 0,
                draw: filters.draw,
            });
        }

        self.history.query_log(&filters).await
    }
}
