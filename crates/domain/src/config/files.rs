use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    /// Resolver log file tailed for DNS events.
    #[serde(default = "default_resolver_log")]
    pub resolver_log: String,

    /// Our own log file; only probed for disk usage.
    #[serde(default = "default_own_log")]
    pub log: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            resolver_log: default_resolver_log(),
            log: default_own_log(),
        }
    }
}

fn default_resolver_log() -> String {
    "/var/log/resolver.log".to_string()
}

fn default_own_log() -> String {
    "/var/log/vigil-dns.log".to_string()
}
