use std::fmt;
use std::str::FromStr;

/// Final (or intermediate) verdict of a tracked query.
///
/// The integer code is stored in the `status` column of both query tables
/// and must therefore stay stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryStatus {
    #[default]
    Unknown,
    Gravity,
    Forwarded,
    Cache,
    Regex,
    Denylist,
    ExternalBlockedIp,
    ExternalBlockedNull,
    ExternalBlockedNxra,
    GravityCname,
    RegexCname,
    DenylistCname,
    Retried,
    RetriedDnssec,
    InProgress,
    DbBusy,
    SpecialDomain,
    CacheStale,
}

pub const STATUS_COUNT: usize = 18;

impl QueryStatus {
    pub const ALL: [QueryStatus; STATUS_COUNT] = [
        QueryStatus::Unknown,
        QueryStatus::Gravity,
        QueryStatus::Forwarded,
        QueryStatus::Cache,
        QueryStatus::Regex,
        QueryStatus::Denylist,
        QueryStatus::ExternalBlockedIp,
        QueryStatus::ExternalBlockedNull,
        QueryStatus::ExternalBlockedNxra,
        QueryStatus::GravityCname,
        QueryStatus::RegexCname,
        QueryStatus::DenylistCname,
        QueryStatus::Retried,
        QueryStatus::RetriedDnssec,
        QueryStatus::InProgress,
        QueryStatus::DbBusy,
        QueryStatus::SpecialDomain,
        QueryStatus::CacheStale,
    ];

    pub fn code(&self) -> i64 {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Unknown => "UNKNOWN",
            QueryStatus::Gravity => "GRAVITY",
            QueryStatus::Forwarded => "FORWARDED",
            QueryStatus::Cache => "CACHE",
            QueryStatus::Regex => "REGEX",
            QueryStatus::Denylist => "DENYLIST",
            QueryStatus::ExternalBlockedIp => "EXTERNAL_BLOCKED_IP",
            QueryStatus::ExternalBlockedNull => "EXTERNAL_BLOCKED_NULL",
            QueryStatus::ExternalBlockedNxra => "EXTERNAL_BLOCKED_NXRA",
            QueryStatus::GravityCname => "GRAVITY_CNAME",
            QueryStatus::RegexCname => "REGEX_CNAME",
            QueryStatus::DenylistCname => "DENYLIST_CNAME",
            QueryStatus::Retried => "RETRIED",
            QueryStatus::RetriedDnssec => "RETRIED_DNSSEC",
            QueryStatus::InProgress => "IN_PROGRESS",
            QueryStatus::DbBusy => "DBBUSY",
            QueryStatus::SpecialDomain => "SPECIAL_DOMAIN",
            QueryStatus::CacheStale => "CACHE_STALE",
        }
    }

    /// Whether this status contributes to the blocked aggregates
    /// (domain/client blocked counts and the overtime `blocked` column).
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            QueryStatus::Gravity
                | QueryStatus::Regex
                | QueryStatus::Denylist
                | QueryStatus::ExternalBlockedIp
                | QueryStatus::ExternalBlockedNull
                | QueryStatus::ExternalBlockedNxra
                | QueryStatus::GravityCname
                | QueryStatus::RegexCname
                | QueryStatus::DenylistCname
                | QueryStatus::DbBusy
                | QueryStatus::SpecialDomain
        )
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, QueryStatus::Cache | QueryStatus::CacheStale)
    }

    pub fn is_forwarded(&self) -> bool {
        matches!(
            self,
            QueryStatus::Forwarded | QueryStatus::Retried | QueryStatus::RetriedDnssec
        )
    }

    /// CNAME-chain variants always supersede their plain counterparts.
    pub fn cname_variant(&self) -> Option<QueryStatus> {
        match self {
            QueryStatus::Gravity => Some(QueryStatus::GravityCname),
            QueryStatus::Regex => Some(QueryStatus::RegexCname),
            QueryStatus::Denylist => Some(QueryStatus::DenylistCname),
            _ => None,
        }
    }

    pub fn is_cname_variant(&self) -> bool {
        matches!(
            self,
            QueryStatus::GravityCname | QueryStatus::RegexCname | QueryStatus::DenylistCname
        )
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown query status: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in QueryStatus::ALL {
            assert_eq!(QueryStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(QueryStatus::from_code(STATUS_COUNT as i64), None);
    }

    #[test]
    fn wire_forms_are_stable() {
        assert_eq!(QueryStatus::Gravity.code(), 1);
        assert_eq!(QueryStatus::CacheStale.code(), 17);
        assert_eq!("external_blocked_nxra".parse::<QueryStatus>().unwrap(),
                   QueryStatus::ExternalBlockedNxra);
        assert!("NOT_A_STATUS".parse::<QueryStatus>().is_err());
    }

    #[test]
    fn blocked_set_matches_aggregation_rules() {
        assert!(QueryStatus::Gravity.is_blocked());
        assert!(QueryStatus::GravityCname.is_blocked());
        assert!(QueryStatus::DbBusy.is_blocked());
        assert!(!QueryStatus::Forwarded.is_blocked());
        assert!(!QueryStatus::Retried.is_blocked());
        assert!(!QueryStatus::CacheStale.is_blocked());
        assert!(!QueryStatus::InProgress.is_blocked());
    }
}
