pub mod parser;

use chrono::Datelike;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_dns_application::Core;
use vigil_dns_domain::{DnsEvent, QueryStart};

use parser::{ParsedLine, parse_line};

/// Tails the resolver's log file and feeds the engine. Transactions are
/// correlated by domain: a follow-up line targets the most recent open query
/// for its domain, and a fresh query for the same domain freezes the old one.
pub struct LogTailer {
    core: Arc<Core>,
    path: PathBuf,
    cancel: CancellationToken,
    /// domain -> (query id, admission timestamp)
    open: HashMap<String, (i64, f64)>,
    carry: String,
    pos: u64,
}

impl LogTailer {
    pub fn new(core: Arc<Core>, path: impl Into<PathBuf>, cancel: CancellationToken) -> Self {
        Self {
            core,
            path: path.into(),
            cancel,
            open: HashMap::new(),
            carry: String::new(),
            pos: 0,
        }
    }

    pub async fn run(mut self) {
        // Start at the current end of the log; history before our start is
        // the previous run's business.
        self.pos = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        info!(path = %self.path.display(), "Tailing resolver log");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            }

            let len = match tokio::fs::metadata(&self.path).await {
                Ok(m) => m.len(),
                Err(_) => continue,
            };

            if len < self.pos {
                // Log was rotated or truncated underneath us; the engine
                // resets together with it.
                warn!(path = %self.path.display(), "Resolver log was flushed, resetting");
                self.core.flush_all(unix_now() as i64);
                self.open.clear();
                self.carry.clear();
                self.pos = 0;
            }

            if len > self.pos {
                if let Err(e) = self.consume_new_data(len).await {
                    warn!(error = %e, "Failed reading resolver log");
                }
            }
        }

        info!("Resolver log tailer stopped");
    }

    async fn consume_new_data(&mut self, len: u64) -> std::io::Result<()> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.pos)).await?;

        let mut buf = vec![0u8; (len - self.pos) as usize];
        file.read_exact(&mut buf).await?;
        self.pos = len;

        self.carry.push_str(&String::from_utf8_lossy(&buf));

        while let Some(newline) = self.carry.find('\n') {
            let line: String = self.carry.drain(..=newline).collect();
            self.handle_line(line.trim_end());
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let year = chrono::Utc::now().year();
        let Some(entry) = parse_line(line, year) else {
            return;
        };
        let now = unix_now();
        let ts = entry.timestamp.unwrap_or(now);

        match entry.line {
            ParsedLine::Query {
                qtype,
                domain,
                client,
            } => {
                let (id, _verdict) = self.core.admit(QueryStart {
                    timestamp: ts,
                    qtype,
                    domain: domain.clone(),
                    client_ip: client,
                    client_name: None,
                });
                // The previous transaction for this domain is frozen the
                // moment a new one arrives.
                self.open.insert(domain, (id, ts));
            }
            ParsedLine::Forwarded {
                domain,
                upstream,
                port,
            } => self.dispatch(&domain, DnsEvent::Forwarded { upstream, port }),
            ParsedLine::Cached { domain, stale } => {
                self.dispatch(&domain, DnsEvent::CacheHit { stale, timestamp: ts })
            }
            ParsedLine::GravityBlocked { domain } => {
                self.dispatch(&domain, DnsEvent::Gravity { deep_cname: false })
            }
            ParsedLine::ExactlyBlocked { domain } => {
                self.dispatch(&domain, DnsEvent::Denylist { deep_cname: false })
            }
            ParsedLine::RegexBlocked { domain } => self.dispatch(
                &domain,
                DnsEvent::Regex {
                    regex_id: 0,
                    deep_cname: false,
                },
            ),
            ParsedLine::SpecialDomain { domain } => self.dispatch(&domain, DnsEvent::SpecialDomain),
            ParsedLine::Reply { domain, reply } => {
                let Some(&(id, admitted)) = self.open.get(&domain) else {
                    debug!(domain = %domain, "Reply for unknown transaction");
                    return;
                };
                let reply_time_ms = ((ts - admitted) * 1000.0).max(0.0);
                self.core.apply(
                    id,
                    DnsEvent::Reply {
                        reply,
                        reply_time_ms,
                        ttl: 0,
                    },
                );
            }
            ParsedLine::Validation { domain, status } => {
                self.dispatch(&domain, DnsEvent::Dnssec { status })
            }
            ParsedLine::Retried { domain, dnssec } => {
                self.dispatch(&domain, DnsEvent::Retried { dnssec })
            }
        }
    }

    fn dispatch(&mut self, domain: &str, event: DnsEvent) {
        let Some(&(id, _)) = self.open.get(domain) else {
            debug!(domain, "Event for unknown transaction");
            return;
        };
        self.core.apply(id, event);
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
