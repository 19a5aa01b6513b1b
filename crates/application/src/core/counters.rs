use vigil_dns_domain::dnssec::DNSSEC_COUNT;
use vigil_dns_domain::query_type::TYPE_COUNT;
use vigil_dns_domain::reply::REPLY_COUNT;
use vigil_dns_domain::status::STATUS_COUNT;
use vigil_dns_domain::{DnssecStatus, QueryStatus, QueryType, ReplyType};

/// Live process-wide counters. Only two places mutate these: query
/// admission/retirement and `change_status`.
#[derive(Debug, Clone)]
pub struct Counters {
    /// Queries currently accounted for in memory.
    pub queries: i64,
    pub status: [i64; STATUS_COUNT],
    pub querytype: [i64; TYPE_COUNT],
    pub reply: [i64; REPLY_COUNT],
    pub dnssec: [i64; DNSSEC_COUNT],
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            queries: 0,
            status: [0; STATUS_COUNT],
            querytype: [0; TYPE_COUNT],
            reply: [0; REPLY_COUNT],
            dnssec: [0; DNSSEC_COUNT],
        }
    }
}

impl Counters {
    pub fn status_count(&self, s: QueryStatus) -> i64 {
        self.status[s.code() as usize]
    }

    pub fn type_count(&self, t: QueryType) -> i64 {
        self.querytype[t.code() as usize]
    }

    pub fn reply_count(&self, r: ReplyType) -> i64 {
        self.reply[r.code() as usize]
    }

    pub fn dnssec_count(&self, d: DnssecStatus) -> i64 {
        self.dnssec[d.code() as usize]
    }

    pub fn status_sum(&self) -> i64 {
        self.status.iter().sum()
    }

    pub fn type_sum(&self) -> i64 {
        self.querytype.iter().sum()
    }

    pub fn blocked(&self) -> i64 {
        QueryStatus::ALL
            .iter()
            .filter(|s| s.is_blocked())
            .map(|s| self.status_count(*s))
            .sum()
    }

    pub fn cached(&self) -> i64 {
        self.status_count(QueryStatus::Cache) + self.status_count(QueryStatus::CacheStale)
    }

    pub fn forwarded(&self) -> i64 {
        self.status_count(QueryStatus::Forwarded)
            + self.status_count(QueryStatus::Retried)
            + self.status_count(QueryStatus::RetriedDnssec)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
