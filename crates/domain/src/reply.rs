use std::fmt;
use std::str::FromStr;

/// What the resolver ultimately answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReplyType {
    #[default]
    Unknown,
    NoData,
    NxDomain,
    Cname,
    Ip,
    Domain,
    RrName,
    ServFail,
    Refused,
    NotImp,
    Other,
    Dnssec,
    None,
    Blob,
}

pub const REPLY_COUNT: usize = 14;

impl ReplyType {
    pub const ALL: [ReplyType; REPLY_COUNT] = [
        ReplyType::Unknown,
        ReplyType::NoData,
        ReplyType::NxDomain,
        ReplyType::Cname,
        ReplyType::Ip,
        ReplyType::Domain,
        ReplyType::RrName,
        ReplyType::ServFail,
        ReplyType::Refused,
        ReplyType::NotImp,
        ReplyType::Other,
        ReplyType::Dnssec,
        ReplyType::None,
        ReplyType::Blob,
    ];

    pub fn code(&self) -> i64 {
        Self::ALL.iter().position(|r| r == self).unwrap_or(0) as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyType::Unknown => "UNKNOWN",
            ReplyType::NoData => "NODATA",
            ReplyType::NxDomain => "NXDOMAIN",
            ReplyType::Cname => "CNAME",
            ReplyType::Ip => "IP",
            ReplyType::Domain => "DOMAIN",
            ReplyType::RrName => "RRNAME",
            ReplyType::ServFail => "SERVFAIL",
            ReplyType::Refused => "REFUSED",
            ReplyType::NotImp => "NOTIMP",
            ReplyType::Other => "OTHER",
            ReplyType::Dnssec => "DNSSEC",
            ReplyType::None => "NONE",
            ReplyType::Blob => "BLOB",
        }
    }

    /// Upstream answers counted as failures on the upstream record.
    pub fn is_failure(&self) -> bool {
        matches!(self, ReplyType::ServFail | ReplyType::Refused)
    }
}

impl fmt::Display for ReplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown reply type: {s}"))
    }
}
