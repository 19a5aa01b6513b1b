use async_trait::async_trait;
use vigil_dns_domain::{DomainError, QueryRow};

/// Filter and pagination parameters for the query-log read path. All fields
/// are optional; enum fields arrive pre-resolved to their integer codes.
#[derive(Debug, Clone, Default)]
pub struct QueryLogFilters {
    pub from: Option<f64>,
    pub until: Option<f64>,
    pub domain: Option<String>,
    pub client: Option<String>,
    pub upstream: Option<String>,
    pub qtype: Option<i64>,
    pub status: Option<i64>,
    pub reply: Option<i64>,
    pub dnssec: Option<i64>,
    pub cursor: Option<i64>,
    pub start: u64,
    /// Negative streams everything; zero returns nothing.
    pub length: i64,
    pub draw: i64,
    /// Read from the attached long-term database instead of memory.
    pub disk: bool,
}

impl QueryLogFilters {
    pub fn new() -> Self {
        Self {
            length: 100,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryLogPage {
    pub queries: Vec<QueryRow>,
    /// Stable pagination anchor: the request cursor if one was supplied,
    /// otherwise the id of the first row seen.
    pub cursor: Option<i64>,
    pub records_total: u64,
    pub records_filtered: u64,
    pub draw: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DbCounts {
    pub largest_id: i64,
    pub mem_rows: u64,
    pub disk_rows: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionLists {
    pub domains: Vec<String>,
    pub clients: Vec<String>,
    pub upstreams: Vec<String>,
}

/// The two-tier SQL mirror: an in-memory database holding what the ring
/// holds, and an attachable on-disk database for long-term history.
#[async_trait]
pub trait QueryHistoryRepository: Send + Sync {
    /// Insert or replace a batch of denormalized queries in the mem table
    /// and refresh the suggestion side tables.
    async fn store_queries(&self, rows: &[QueryRow]) -> Result<u64, DomainError>;

    /// Copy rows newer than the disk high-water mark into the long-term
    /// database.
    async fn mirror_to_disk(&self) -> Result<u64, DomainError>;

    async fn delete_older_than_mem(&self, mintime: f64) -> Result<u64, DomainError>;

    async fn delete_older_than_disk(&self, mintime: f64) -> Result<u64, DomainError>;

    async fn counts(&self) -> Result<DbCounts, DomainError>;

    async fn query_log(&self, filters: &QueryLogFilters) -> Result<QueryLogPage, DomainError>;

    async fn suggestions(&self, count: u32) -> Result<SuggestionLists, DomainError>;

    /// Append a diagnostic message to the long-term database.
    async fn log_message(&self, kind: &str, message: &str) -> Result<(), DomainError>;
}
