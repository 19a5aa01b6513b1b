mod maintenance;
mod reader;
mod writer;

use async_trait::async_trait;
use sqlx::SqlitePool;
use vigil_dns_application::ports::{
    DbCounts, QueryHistoryRepository, QueryLogFilters, QueryLogPage, SuggestionLists,
};
use vigil_dns_domain::{DomainError, QueryRow};

/// The two-tier SQL mirror. The mem pool is a single connection owning a
/// private in-memory database; disk reads attach the long-term file to that
/// connection for the duration of one statement. The disk pool serves
/// writes, trims and the session/message tables.
pub struct SqliteQueryHistory {
    mem: SqlitePool,
    disk: SqlitePool,
    disk_path: String,
}

impl SqliteQueryHistory {
    pub fn new(mem: SqlitePool, disk: SqlitePool, disk_path: impl Into<String>) -> Self {
        Self {
            mem,
            disk,
            disk_path: disk_path.into(),
        }
    }

    pub fn mem_pool(&self) -> &SqlitePool {
        &self.mem
    }

    pub fn disk_pool(&self) -> &SqlitePool {
        &self.disk
    }
}

#[async_trait]
impl QueryHistoryRepository for SqliteQueryHistory {
    async fn store_queries(&self, rows: &[QueryRow]) -> Result<u64, DomainError> {
        writer::store_queries(&self.mem, rows).await
    }

    async fn mirror_to_disk(&self) -> Result<u64, DomainError> {
        maintenance::mirror_to_disk(&self.mem, &self.disk_path).await
    }

    async fn delete_older_than_mem(&self, mintime: f64) -> Result<u64, DomainError> {
        maintenance::delete_older_than(&self.mem, mintime).await
    }

    async fn delete_older_than_disk(&self, mintime: f64) -> Result<u64, DomainError> {
        maintenance::delete_older_than(&self.disk, mintime).await
    }

    async fn counts(&self) -> Result<DbCounts, DomainError> {
        reader::counts(&self.mem, &self.disk).await
    }

    async fn query_log(&self, filters: &QueryLogFilters) -> Result<QueryLogPage, DomainError> {
        reader::query_log(&self.mem, &self.disk, &self.disk_path, filters).await
    }

    async fn suggestions(&self, count: u32) -> Result<SuggestionLists, DomainError> {
        reader::suggestions(&self.mem, count).await
    }

    async fn log_message(&self, kind: &str, message: &str) -> Result<(), DomainError> {
        maintenance::log_message(&self.disk, kind, message).await
    }
}
