use chrono::NaiveDateTime;
use std::net::IpAddr;
use std::str::FromStr;
use vigil_dns_domain::{DnssecStatus, QueryType, ReplyType};

/// One recognized resolver log line, still keyed by domain; the tailer
/// correlates it to an open query id.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Query {
        qtype: QueryType,
        domain: String,
        client: String,
    },
    Forwarded {
        domain: String,
        upstream: String,
        port: u16,
    },
    Cached {
        domain: String,
        stale: bool,
    },
    GravityBlocked {
        domain: String,
    },
    ExactlyBlocked {
        domain: String,
    },
    RegexBlocked {
        domain: String,
    },
    SpecialDomain {
        domain: String,
    },
    Reply {
        domain: String,
        reply: ReplyType,
    },
    Validation {
        domain: String,
        status: DnssecStatus,
    },
    Retried {
        domain: String,
        dnssec: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    /// Unix seconds from the syslog prefix, when one was present.
    pub timestamp: Option<f64>,
    pub line: ParsedLine,
}

/// Parse one line of the resolver log. Returns `None` for anything that is
/// not a recognized DNS event; callers treat those lines as noise.
pub fn parse_line(raw: &str, year: i32) -> Option<ParsedEntry> {
    let (timestamp, rest) = split_syslog_prefix(raw, year);
    let payload = rest.trim();

    let line = if let Some(after) = payload.strip_prefix("query[") {
        let (type_str, tail) = after.split_once(']')?;
        let mut words = tail.split_whitespace();
        let domain = words.next()?;
        let from = words.next()?;
        if from != "from" {
            return None;
        }
        let client = words.next()?;
        ParsedLine::Query {
            qtype: QueryType::from_str(type_str).unwrap_or(QueryType::Other),
            domain: domain.to_ascii_lowercase(),
            client: client.to_string(),
        }
    } else if let Some(tail) = payload.strip_prefix("forwarded ") {
        let mut words = tail.split_whitespace();
        let domain = words.next()?;
        if words.next()? != "to" {
            return None;
        }
        let target = words.next()?;
        let (upstream, port) = match target.split_once('#') {
            Some((ip, port)) => (ip, port.parse().ok()?),
            None => (target, 53),
        };
        ParsedLine::Forwarded {
            domain: domain.to_ascii_lowercase(),
            upstream: upstream.to_string(),
            port,
        }
    } else if let Some(tail) = payload.strip_prefix("cached-stale ") {
        ParsedLine::Cached {
            domain: first_word(tail)?.to_ascii_lowercase(),
            stale: true,
        }
    } else if let Some(tail) = payload.strip_prefix("cached ") {
        ParsedLine::Cached {
            domain: first_word(tail)?.to_ascii_lowercase(),
            stale: false,
        }
    } else if let Some(tail) = payload.strip_prefix("gravity blocked ") {
        ParsedLine::GravityBlocked {
            domain: first_word(tail)?.to_ascii_lowercase(),
        }
    } else if let Some(tail) = payload.strip_prefix("exactly blocked ") {
        ParsedLine::ExactlyBlocked {
            domain: first_word(tail)?.to_ascii_lowercase(),
        }
    } else if let Some(tail) = payload.strip_prefix("regex blocked ") {
        ParsedLine::RegexBlocked {
            domain: first_word(tail)?.to_ascii_lowercase(),
        }
    } else if let Some(tail) = payload.strip_prefix("special domain ") {
        ParsedLine::SpecialDomain {
            domain: first_word(tail)?.to_ascii_lowercase(),
        }
    } else if let Some(tail) = payload.strip_prefix("reply ") {
        let mut words = tail.split_whitespace();
        let domain = words.next()?;
        if words.next()? != "is" {
            return None;
        }
        let answer = words.next()?;
        ParsedLine::Reply {
            domain: domain.to_ascii_lowercase(),
            reply: classify_answer(answer),
        }
    } else if let Some(tail) = payload.strip_prefix("validation ") {
        let mut words = tail.split_whitespace();
        let domain = words.next()?;
        if words.next()? != "is" {
            return None;
        }
        let status = match words.next()? {
            "SECURE" => DnssecStatus::Secure,
            "INSECURE" => DnssecStatus::Insecure,
            "BOGUS" => DnssecStatus::Bogus,
            "ABANDONED" => DnssecStatus::Abandoned,
            "TRUNCATED" => DnssecStatus::Truncated,
            _ => return None,
        };
        ParsedLine::Validation {
            domain: domain.to_ascii_lowercase(),
            status,
        }
    } else if let Some(tail) = payload.strip_prefix("retried[dnssec] ") {
        ParsedLine::Retried {
            domain: first_word(tail)?.to_ascii_lowercase(),
            dnssec: true,
        }
    } else if let Some(tail) = payload.strip_prefix("retried ") {
        ParsedLine::Retried {
            domain: first_word(tail)?.to_ascii_lowercase(),
            dnssec: false,
        }
    } else {
        return None;
    };

    Some(ParsedEntry { timestamp, line })
}

/// Strip `Mon DD HH:MM:SS [host] process[pid]:` and return the payload after
/// the first `]: `. Lines without the prefix are handed back whole.
fn split_syslog_prefix(raw: &str, year: i32) -> (Option<f64>, &str) {
    let timestamp = raw
        .get(..15)
        .and_then(|p| NaiveDateTime::parse_from_str(&format!("{year} {p}"), "%Y %b %e %H:%M:%S").ok())
        .map(|dt| dt.and_utc().timestamp() as f64);

    match raw.split_once("]: ") {
        Some((_, payload)) => (timestamp, payload),
        None => (timestamp, raw),
    }
}

fn first_word(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

fn classify_answer(answer: &str) -> ReplyType {
    match answer {
        "NXDOMAIN" => ReplyType::NxDomain,
        "NODATA" | "NODATA-IPv4" | "NODATA-IPv6" => ReplyType::NoData,
        "SERVFAIL" => ReplyType::ServFail,
        "REFUSED" => ReplyType::Refused,
        "NOTIMP" => ReplyType::NotImp,
        "<CNAME>" => ReplyType::Cname,
        _ => {
            if answer.parse::<IpAddr>().is_ok() {
                ReplyType::Ip
            } else if answer.contains('.') {
                ReplyType::Domain
            } else {
                ReplyType::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2026;

    fn parse(line: &str) -> ParsedEntry {
        parse_line(line, YEAR).expect("line should parse")
    }

    #[test]
    fn query_line() {
        let entry = parse("Jul 30 13:05:23 dnsmasq[123]: query[A] Example.COM from 10.0.0.1");
        assert!(entry.timestamp.is_some());
        assert_eq!(
            entry.line,
            ParsedLine::Query {
                qtype: QueryType::A,
                domain: "example.com".into(),
                client: "10.0.0.1".into(),
            }
        );
    }

    #[test]
    fn unknown_query_type_folds_to_other() {
        let entry = parse("Jul 30 13:05:23 dnsmasq[123]: query[TYPE=65479] x.example from 10.0.0.1");
        assert!(matches!(
            entry.line,
            ParsedLine::Query {
                qtype: QueryType::Other,
                ..
            }
        ));
    }

    #[test]
    fn forwarded_with_and_without_port() {
        let entry = parse("Jul 30 13:05:23 dnsmasq[123]: forwarded example.com to 8.8.8.8#5353");
        assert_eq!(
            entry.line,
            ParsedLine::Forwarded {
                domain: "example.com".into(),
                upstream: "8.8.8.8".into(),
                port: 5353,
            }
        );
        let entry = parse("Jul 30 13:05:23 dnsmasq[123]: forwarded example.com to 9.9.9.9");
        assert!(matches!(entry.line, ParsedLine::Forwarded { port: 53, .. }));
    }

    #[test]
    fn blocking_lines() {
        let entry = parse("Jul 30 13:05:24 dnsmasq[123]: gravity blocked ad.example is 0.0.0.0");
        assert_eq!(
            entry.line,
            ParsedLine::GravityBlocked {
                domain: "ad.example".into()
            }
        );
        let entry = parse("Jul 30 13:05:24 dnsmasq[123]: regex blocked tracker.example is NXDOMAIN");
        assert!(matches!(entry.line, ParsedLine::RegexBlocked { .. }));
        let entry = parse("Jul 30 13:05:24 dnsmasq[123]: exactly blocked bad.example is 0.0.0.0");
        assert!(matches!(entry.line, ParsedLine::ExactlyBlocked { .. }));
    }

    #[test]
    fn reply_classification() {
        let cases = [
            ("93.184.216.34", ReplyType::Ip),
            ("2606:2800:220:1::1", ReplyType::Ip),
            ("NXDOMAIN", ReplyType::NxDomain),
            ("NODATA-IPv6", ReplyType::NoData),
            ("SERVFAIL", ReplyType::ServFail),
            ("<CNAME>", ReplyType::Cname),
            ("cdn.example.net", ReplyType::Domain),
        ];
        for (answer, expected) in cases {
            let entry = parse(&format!(
                "Jul 30 13:05:25 dnsmasq[123]: reply example.com is {answer}"
            ));
            assert_eq!(
                entry.line,
                ParsedLine::Reply {
                    domain: "example.com".into(),
                    reply: expected,
                },
                "answer {answer}"
            );
        }
    }

    #[test]
    fn validation_and_retry() {
        let entry = parse("Jul 30 13:05:25 dnsmasq[123]: validation example.com is BOGUS");
        assert_eq!(
            entry.line,
            ParsedLine::Validation {
                domain: "example.com".into(),
                status: DnssecStatus::Bogus,
            }
        );
        let entry = parse("Jul 30 13:05:26 dnsmasq[123]: retried[dnssec] example.com");
        assert!(matches!(entry.line, ParsedLine::Retried { dnssec: true, .. }));
    }

    #[test]
    fn noise_is_ignored() {
        assert!(parse_line("Jul 30 13:05:23 dnsmasq[123]: started, version 2.90", YEAR).is_none());
        assert!(parse_line("", YEAR).is_none());
        assert!(parse_line("random text", YEAR).is_none());
    }

    #[test]
    fn payload_without_syslog_prefix_still_parses() {
        let entry = parse_line("query[AAAA] example.com from fe80::1", YEAR).unwrap();
        assert!(entry.timestamp.is_none());
        assert!(matches!(entry.line, ParsedLine::Query { .. }));
    }
}
