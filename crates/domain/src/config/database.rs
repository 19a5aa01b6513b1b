use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Seconds between flushes of dirty queries into the mem database.
    #[serde(default = "default_mem_flush_interval")]
    pub mem_flush_interval: u64,

    /// Seconds between mirroring passes into the disk database.
    #[serde(default = "default_disk_flush_interval")]
    pub disk_flush_interval: u64,

    /// Days of history kept on disk; 0 keeps everything.
    #[serde(default = "default_max_db_days")]
    pub max_db_days: u32,

    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            mem_flush_interval: default_mem_flush_interval(),
            disk_flush_interval: default_disk_flush_interval(),
            max_db_days: default_max_db_days(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

fn default_db_path() -> String {
    "./vigil-dns.db".to_string()
}

fn default_mem_flush_interval() -> u64 {
    1
}

fn default_disk_flush_interval() -> u64 {
    60
}

fn default_max_db_days() -> u32 {
    91
}

fn default_busy_timeout_secs() -> u64 {
    5
}
