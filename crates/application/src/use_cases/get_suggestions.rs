use std::sync::Arc;

use vigil_dns_domain::{DomainError, DnssecStatus, QueryStatus, QueryType, ReplyType};

use crate::ports::{QueryHistoryRepository, SuggestionLists};

/// Everything the query-log UI can autocomplete on: observed values from the
/// mirror's side tables plus the statically known enum forms.
#[derive(Debug, Clone, Default)]
pub struct Suggestions {
    pub domains: Vec<String>,
    pub clients: Vec<String>,
    pub upstreams: Vec<String>,
    pub types: Vec<&'static str>,
    pub statuses: Vec<&'static str>,
    pub replies: Vec<&'static str>,
    pub dnssec: Vec<&'static str>,
}

pub struct GetSuggestionsUseCase {
    history: Arc<dyn QueryHistoryRepository>,
}

impl GetSuggestionsUseCase {
    pub fn new(history: Arc<dyn QueryHistoryRepository>) -> Self {
        Self { history }
    }

    pub async fn execute(&self, count: u32) -> Result<Suggestions, DomainError> {
        let SuggestionLists {
            domains,
            clients,
            upstreams,
        } = self.history.suggestions(count).await?;

        Ok(Suggestions {
            domains,
            clients,
            upstreams,
            types: QueryType::ALL.iter().map(|t| t.as_str()).collect(),
            statuses: QueryStatus::ALL.iter().map(|s| s.as_str()).collect(),
            replies: ReplyType::ALL.iter().map(|r| r.as_str()).collect(),
            dnssec: DnssecStatus::ALL.iter().map(|d| d.as_str()).collect(),
        })
    }
}
