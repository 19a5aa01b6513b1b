use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckConfig {
    /// Warn when the 15 minute load average exceeds the core count.
    #[serde(default = "default_true")]
    pub load: bool,

    /// Warn when partition usage exceeds this percentage; 0 disables.
    #[serde(default = "default_disk_threshold")]
    pub disk: u8,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            load: true,
            disk: default_disk_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MiscConfig {
    #[serde(default)]
    pub check: CheckConfig,
}

fn default_true() -> bool {
    true
}

fn default_disk_threshold() -> u8 {
    90
}
