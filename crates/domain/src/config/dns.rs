use serde::{Deserialize, Serialize};

/// Reply handed to clients whose queries cannot be answered normally
/// (rate-limited clients, busy database).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusyReply {
    /// Answer as if the list were empty.
    Allow,
    /// Answer with the configured blocking reply.
    Block,
    #[default]
    Refuse,
    /// Do not answer at all.
    Drop,
}

impl BusyReply {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusyReply::Allow => "allow",
            BusyReply::Block => "block",
            BusyReply::Refuse => "refuse",
            BusyReply::Drop => "drop",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Queries allowed per client per interval; 0 disables rate limiting.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Window length in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            interval: default_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DnsConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub reply_when_busy: BusyReply,

    /// Capacity of the in-memory query ring.
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
}

fn default_count() -> u32 {
    1000
}

fn default_interval() -> u64 {
    60
}

fn default_ring_capacity() -> usize {
    65536
}
