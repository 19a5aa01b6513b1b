use crate::{DnssecStatus, QueryStatus, QueryType, ReplyType};

/// Handle into the string arena. Handles are assigned once and never reused
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(pub u32);

impl StringId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    /// The reply for this query has been seen; no further refinement expected.
    pub complete: bool,
    /// The admitting client was over its rate-limit window.
    pub rate_limited: bool,
    /// The blocking decision was made on a CNAME deeper in the chain.
    pub cname_from_deep_inspect: bool,
    /// Already counted as forwarded once; a retry must not count again.
    pub retry_counted: bool,
}

/// One tracked DNS transaction as held in the in-memory ring.
///
/// String-valued fields are interner handles; the mirror denormalizes them
/// to text at flush time.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub id: i64,
    /// Unix seconds, fractional.
    pub timestamp: f64,
    pub qtype: QueryType,
    pub status: QueryStatus,
    pub reply: ReplyType,
    pub reply_time_ms: f64,
    pub dnssec: DnssecStatus,
    pub ttl: i64,
    pub domain_id: StringId,
    pub client_id: StringId,
    pub upstream_id: Option<usize>,
    pub regex_id: Option<i64>,
    pub client_name_id: Option<StringId>,
    pub additional_info: Option<String>,
    pub flags: QueryFlags,
    /// Needs (re-)writing to the mirror on the next flush.
    pub dirty: bool,
}

/// A query denormalized for the SQL mirror. Column order matches the
/// `queries` tables everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub id: i64,
    pub timestamp: f64,
    pub qtype: i64,
    pub status: i64,
    pub domain: String,
    pub client: String,
    pub forward: Option<String>,
    pub additional_info: Option<String>,
    pub reply_type: i64,
    pub reply_time: f64,
    pub dnssec: i64,
    pub client_name: Option<String>,
    pub ttl: i64,
    pub regex_id: Option<i64>,
}
