use std::fmt;
use std::str::FromStr;

/// Record type of an observed query, collapsed to the set the aggregates
/// track individually. Everything else is folded into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryType {
    #[default]
    A,
    AAAA,
    PTR,
    SRV,
    TXT,
    CNAME,
    SOA,
    MX,
    NS,
    ANY,
    SVCB,
    HTTPS,
    NAPTR,
    DS,
    DNSKEY,
    Other,
}

pub const TYPE_COUNT: usize = 16;

impl QueryType {
    pub const ALL: [QueryType; TYPE_COUNT] = [
        QueryType::A,
        QueryType::AAAA,
        QueryType::PTR,
        QueryType::SRV,
        QueryType::TXT,
        QueryType::CNAME,
        QueryType::SOA,
        QueryType::MX,
        QueryType::NS,
        QueryType::ANY,
        QueryType::SVCB,
        QueryType::HTTPS,
        QueryType::NAPTR,
        QueryType::DS,
        QueryType::DNSKEY,
        QueryType::Other,
    ];

    pub fn code(&self) -> i64 {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0) as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::A => "A",
            QueryType::AAAA => "AAAA",
            QueryType::PTR => "PTR",
            QueryType::SRV => "SRV",
            QueryType::TXT => "TXT",
            QueryType::CNAME => "CNAME",
            QueryType::SOA => "SOA",
            QueryType::MX => "MX",
            QueryType::NS => "NS",
            QueryType::ANY => "ANY",
            QueryType::SVCB => "SVCB",
            QueryType::HTTPS => "HTTPS",
            QueryType::NAPTR => "NAPTR",
            QueryType::DS => "DS",
            QueryType::DNSKEY => "DNSKEY",
            QueryType::Other => "OTHER",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown query type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("https".parse::<QueryType>().unwrap(), QueryType::HTTPS);
        assert_eq!("aaaa".parse::<QueryType>().unwrap(), QueryType::AAAA);
        assert!("AXFR".parse::<QueryType>().is_err());
    }

    #[test]
    fn codes_round_trip() {
        for t in QueryType::ALL {
            assert_eq!(QueryType::from_code(t.code()), Some(t));
        }
    }
}
