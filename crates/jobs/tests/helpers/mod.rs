use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vigil_dns_application::ports::{
    DbCounts, QueryHistoryRepository, QueryLogFilters, QueryLogPage, SuggestionLists, SystemProbe,
};
use vigil_dns_domain::{DomainError, QueryRow};

/// In-memory stand-in for the SQL mirror.
#[derive(Default)]
pub struct MockHistory {
    pub rows: Mutex<Vec<QueryRow>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail_stores: AtomicBool,
    pub mem_deletes: Mutex<Vec<f64>>,
    pub disk_deletes: Mutex<Vec<f64>>,
    pub mirror_calls: AtomicUsize,
}

impl MockHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stored(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryHistoryRepository for MockHistory {
    async fn store_queries(&self, rows: &[QueryRow]) -> Result<u64, DomainError> {
        if self.fail_stores.load(Ordering::Relaxed) {
            return Err(DomainError::Database("database is locked".to_string()));
        }
        let mut stored = self.rows.lock().unwrap();
        stored.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn mirror_to_disk(&self) -> Result<u64, DomainError> {
        self.mirror_calls.fetch_add(1, Ordering::Relaxed);
        Ok(0)
    }

    async fn delete_older_than_mem(&self, mintime: f64) -> Result<u64, DomainError> {
        self.mem_deletes.lock().unwrap().push(mintime);
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.timestamp >= mintime);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_older_than_disk(&self, mintime: f64) -> Result<u64, DomainError> {
        self.disk_deletes.lock().unwrap().push(mintime);
        Ok(0)
    }

    async fn counts(&self) -> Result<DbCounts, DomainError> {
        let rows = self.rows.lock().unwrap();
        Ok(DbCounts {
            largest_id: rows.iter().map(|r| r.id).max().unwrap_or(0),
            mem_rows: rows.len() as u64,
            disk_rows: 0,
        })
    }

    async fn query_log(&self, filters: &QueryLogFilters) -> Result<QueryLogPage, DomainError> {
        let rows = self.rows.lock().unwrap();
        Ok(QueryLogPage {
            queries: rows.clone(),
            cursor: rows.iter().map(|r| r.id).max(),
            records_total: rows.len() as u64,
            records_filtered: rows.len() as u64,
            draw: filters.draw,
        })
    }

    async fn suggestions(&self, _count: u32) -> Result<SuggestionLists, DomainError> {
        Ok(SuggestionLists::default())
    }

    async fn log_message(&self, kind: &str, message: &str) -> Result<(), DomainError> {
        self.messages
            .lock()
            .unwrap()
            .push((kind.to_string(), message.to_string()));
        Ok(())
    }
}

/// Probe reporting a deliberately overloaded, nearly full host.
pub struct StressedProbe;

impl SystemProbe for StressedProbe {
    fn loadavg(&self) -> Option<[f64; 3]> {
        Some([9.0, 9.0, 99.0])
    }

    fn nprocs(&self) -> usize {
        2
    }

    fn disk_usage_percent(&self, _path: &str) -> Option<u8> {
        Some(97)
    }

    fn same_device(&self, _a: &str, _b: &str) -> Option<bool> {
        None
    }

    fn cpu_busy_fraction(&self) -> Option<f64> {
        Some(0.5)
    }
}
