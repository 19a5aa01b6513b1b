use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DnssecStatus {
    #[default]
    Unknown,
    Secure,
    Insecure,
    Bogus,
    Abandoned,
    Truncated,
    NoSecurity,
    Retry,
}

pub const DNSSEC_COUNT: usize = 8;

impl DnssecStatus {
    pub const ALL: [DnssecStatus; DNSSEC_COUNT] = [
        DnssecStatus::Unknown,
        DnssecStatus::Secure,
        DnssecStatus::Insecure,
        DnssecStatus::Bogus,
        DnssecStatus::Abandoned,
        DnssecStatus::Truncated,
        DnssecStatus::NoSecurity,
        DnssecStatus::Retry,
    ];

    pub fn code(&self) -> i64 {
        Self::ALL.iter().position(|d| d == self).unwrap_or(0) as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DnssecStatus::Unknown => "UNKNOWN",
            DnssecStatus::Secure => "SECURE",
            DnssecStatus::Insecure => "INSECURE",
            DnssecStatus::Bogus => "BOGUS",
            DnssecStatus::Abandoned => "ABANDONED",
            DnssecStatus::Truncated => "TRUNCATED",
            DnssecStatus::NoSecurity => "NO_SECURITY",
            DnssecStatus::Retry => "RETRY",
        }
    }
}

impl fmt::Display for DnssecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnssecStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown dnssec status: {s}"))
    }
}
