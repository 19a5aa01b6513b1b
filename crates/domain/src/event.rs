use crate::{DnssecStatus, QueryType, ReplyType};

/// Admission data for a new query, as reported by the resolver.
#[derive(Debug, Clone)]
pub struct QueryStart {
    pub timestamp: f64,
    pub qtype: QueryType,
    pub domain: String,
    pub client_ip: String,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalBlockKind {
    /// Upstream answered with a known sinkhole address.
    Ip,
    /// Upstream answered 0.0.0.0 / ::.
    Null,
    /// Upstream answered NXDOMAIN with unset RA bit.
    Nxra,
}

/// Follow-up event for an already-admitted query. Each variant corresponds
/// to one reason tag in the resolver's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DnsEvent {
    Gravity { deep_cname: bool },
    Denylist { deep_cname: bool },
    Regex { regex_id: i64, deep_cname: bool },
    SpecialDomain,
    Forwarded { upstream: String, port: u16 },
    CacheHit { stale: bool, timestamp: f64 },
    ExternalBlocked { kind: ExternalBlockKind },
    Retried { dnssec: bool },
    InProgress,
    Reply { reply: ReplyType, reply_time_ms: f64, ttl: i64 },
    Dnssec { status: DnssecStatus },
}
