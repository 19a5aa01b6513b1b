mod classifier;
mod counters;
mod interner;
mod overtime;
mod rate_limit;
mod ring;
mod tables;

pub use counters::Counters;
pub use overtime::{align_bucket, OverTime, OverTimeSlot, BUCKET_SECS};
pub use rate_limit::turnaround;
pub use tables::{ClientRecord, DomainRecord, UpstreamRecord};

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use vigil_dns_domain::config::{BusyReply, PrivacyLevel};
use vigil_dns_domain::{
    Config, DnsEvent, DnssecStatus, QueryFlags, QueryRecord, QueryRow, QueryStart, QueryStatus,
    QueryType, ReplyType,
};

use interner::StringInterner;
use rate_limit::RateCheck;
use ring::QueryRing;
use tables::{ClientTable, DomainTable, UpstreamTable};

/// Placeholder values substituted under elevated privacy levels.
const HIDDEN_DOMAIN: &str = "hidden";
const HIDDEN_CLIENT: &str = "0.0.0.0";

/// Advice to the resolver for a just-admitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
    Refuse { turnaround: i64 },
    Drop,
}

/// Everything guarded by the single coordinating mutex: interner, aggregate
/// tables, query ring, overtime ring and counters. The DNS consumer, the API
/// workers and the housekeeper all serialize on it; none of them hold it
/// across database awaits.
#[derive(Debug)]
pub(crate) struct CoreState {
    pub(crate) interner: StringInterner,
    pub(crate) domains: DomainTable,
    pub(crate) clients: ClientTable,
    pub(crate) upstreams: UpstreamTable,
    pub(crate) ring: QueryRing,
    pub(crate) overtime: OverTime,
    pub(crate) counters: Counters,
}

impl CoreState {
    fn new(ring_capacity: usize, max_history: u64, now: i64) -> Self {
        Self {
            interner: StringInterner::new(),
            domains: DomainTable::default(),
            clients: ClientTable::default(),
            upstreams: UpstreamTable::default(),
            ring: QueryRing::new(ring_capacity),
            overtime: OverTime::new(max_history, now),
            counters: Counters::default(),
        }
    }

    /// Remove one query from every aggregate it contributed to, leaving the
    /// record itself in the ring for the caller to drop. Counter-neutral by
    /// construction: the blocked/cached/forwarded columns are cleared by
    /// resetting the status to `UNKNOWN` through the one entry point.
    fn retire_query(&mut self, id: i64) {
        let Some(q) = self.ring.get(id) else { return };
        let ts = q.timestamp;
        let qtype = q.qtype;
        let reply = q.reply;
        let dnssec = q.dnssec;
        let domain_id = q.domain_id;
        let client_id = q.client_id;

        let bucket = self.overtime.unrecord_query(ts, qtype);
        if let Some(idx) = self.clients.find(client_id) {
            if let Some(client) = self.clients.get_mut(idx) {
                client.count -= 1;
                if let Some(slot) = client.overtime.get_mut(bucket) {
                    *slot -= 1;
                }
            }
        }
        if let Some(idx) = self.domains.find(domain_id) {
            if let Some(domain) = self.domains.get_mut(idx) {
                domain.count -= 1;
            }
        }

        self.change_status(id, QueryStatus::Unknown);

        self.counters.status[QueryStatus::Unknown.code() as usize] -= 1;
        self.counters.querytype[qtype.code() as usize] -= 1;
        self.counters.reply[reply.code() as usize] -= 1;
        self.counters.dnssec[dnssec.code() as usize] -= 1;
        self.counters.queries -= 1;
    }
}

/// The engine. One per process; workers share it behind an `Arc`.
pub struct Core {
    state: Mutex<CoreState>,
    config: Arc<ArcSwap<Config>>,
    db_busy: AtomicBool,
    last_rate_reset: AtomicI64,
}

impl Core {
    pub fn new(config: Arc<ArcSwap<Config>>, now: i64) -> Self {
        let cfg = config.load();
        let state = CoreState::new(cfg.dns.ring_capacity, cfg.api.max_history, now);
        drop(cfg);
        Self {
            state: Mutex::new(state),
            config,
            db_busy: AtomicBool::new(false),
            last_rate_reset: AtomicI64::new(now),
        }
    }

    pub fn config(&self) -> Arc<ArcSwap<Config>> {
        Arc::clone(&self.config)
    }

    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admit a new query: assign its id, update every aggregate and return
    /// the rate-limit verdict for the resolver.
    pub fn admit(&self, start: QueryStart) -> (i64, Verdict) {
        let cfg = self.config.load();
        let privacy = cfg.api.privacy_level;
        let limit = cfg.dns.rate_limit.count;
        let interval = cfg.dns.rate_limit.interval;
        let busy_reply = cfg.dns.reply_when_busy;

        let domain = if privacy >= PrivacyLevel::HideDomains {
            HIDDEN_DOMAIN.to_string()
        } else {
            start.domain.to_ascii_lowercase()
        };
        let client_ip = if privacy >= PrivacyLevel::HideDomainsClients {
            HIDDEN_CLIENT.to_string()
        } else {
            start.client_ip
        };

        let mut guard = self.lock();
        let state = &mut *guard;

        if state.ring.is_full() {
            let oldest = state.ring.base_id();
            state.retire_query(oldest);
            state.ring.drop_oldest(1);
        }

        let domain_id = state.interner.intern(&domain);
        let client_ip_id = state.interner.intern(&client_ip);
        let client_name_id = start
            .client_name
            .as_deref()
            .map(|n| state.interner.intern(n));

        let slots = state.overtime.slot_count();
        let domain_idx = state.domains.find_or_create(domain_id);
        let client_idx = state
            .clients
            .find_or_create(client_ip_id, start.timestamp, slots);

        let bucket = state.overtime.record_query(start.timestamp, start.qtype);
        if let Some(domain) = state.domains.get_mut(domain_idx) {
            domain.count += 1;
        }
        if let Some(client) = state.clients.get_mut(client_idx) {
            client.count += 1;
            client.last_query = start.timestamp;
            if let Some(slot) = client.overtime.get_mut(bucket) {
                *slot += 1;
            }
        }

        state.counters.queries += 1;
        state.counters.status[QueryStatus::Unknown.code() as usize] += 1;
        state.counters.querytype[start.qtype.code() as usize] += 1;
        state.counters.reply[ReplyType::Unknown.code() as usize] += 1;
        state.counters.dnssec[DnssecStatus::Unknown.code() as usize] += 1;

        let id = state.ring.admit(QueryRecord {
            id: 0,
            timestamp: start.timestamp,
            qtype: start.qtype,
            status: QueryStatus::Unknown,
            reply: ReplyType::Unknown,
            reply_time_ms: 0.0,
            dnssec: DnssecStatus::Unknown,
            ttl: 0,
            domain_id,
            client_id: client_ip_id,
            upstream_id: None,
            regex_id: None,
            client_name_id,
            additional_info: None,
            flags: QueryFlags::default(),
            dirty: true,
        });

        if self.db_busy.load(Ordering::Relaxed) {
            state.change_status(id, QueryStatus::DbBusy);
            let verdict = self.busy_verdict(state, id, busy_reply, 0);
            return (id, verdict);
        }

        let check = rate_limit::account_query(&mut state.clients, &state.interner, client_idx, limit);
        if check == RateCheck::Limited {
            let accrued = state
                .clients
                .get(client_idx)
                .map(|c| c.rate_limit_count)
                .unwrap_or(0);
            if let Some(q) = state.ring.get_mut(id) {
                q.flags.rate_limited = true;
                q.dirty = true;
            }
            let elapsed =
                start.timestamp as i64 - self.last_rate_reset.load(Ordering::Relaxed);
            let t = turnaround(accrued, limit, interval, elapsed);
            let verdict = self.busy_verdict(state, id, busy_reply, t);
            return (id, verdict);
        }

        (id, Verdict::Allow)
    }

    fn busy_verdict(
        &self,
        state: &mut CoreState,
        id: i64,
        reply: BusyReply,
        turnaround: i64,
    ) -> Verdict {
        match reply {
            BusyReply::Allow => Verdict::Allow,
            BusyReply::Block => {
                state.change_reply(id, ReplyType::NxDomain);
                Verdict::Block
            }
            BusyReply::Refuse => {
                state.change_reply(id, ReplyType::Refused);
                Verdict::Refuse { turnaround }
            }
            BusyReply::Drop => {
                state.change_reply(id, ReplyType::None);
                Verdict::Drop
            }
        }
    }

    /// Apply a follow-up resolver event to an admitted query. Events for
    /// aged-out ids are logged and dropped.
    pub fn apply(&self, id: i64, event: DnsEvent) {
        self.lock().apply_event(id, event);
    }

    pub fn set_db_busy(&self, busy: bool) {
        self.db_busy.store(busy, Ordering::Relaxed);
    }

    pub fn is_db_busy(&self) -> bool {
        self.db_busy.load(Ordering::Relaxed)
    }

    /// Phase one of a GC run: under the lock, unlink every query with
    /// `timestamp <= mintime` from the aggregates. Returns how many queries
    /// are ready to be dropped in the compaction phase.
    pub fn gc_teardown(&self, mintime: i64) -> usize {
        let mut state = self.lock();
        let mut removed = 0usize;
        loop {
            let Some(front) = state.ring.get(state.ring.base_id() + removed as i64) else {
                break;
            };
            if front.timestamp > mintime as f64 {
                break;
            }
            let id = front.id;
            state.retire_query(id);
            removed += 1;
        }
        debug!(removed, mintime, "GC teardown finished");
        removed
    }

    /// Phase two: drop the retired prefix from the ring and shift the
    /// overtime window (including every per-client mirror).
    pub fn gc_compact(&self, mintime: i64, removed: usize) {
        let mut state = self.lock();
        state.ring.drop_oldest(removed);
        let dropped_slots = state.overtime.shift(mintime);
        if dropped_slots > 0 {
            for client in state.clients.iter_mut() {
                for _ in 0..dropped_slots {
                    client.overtime.pop_front();
                    client.overtime.push_back(0);
                }
            }
        }
    }

    /// Window rollover for the per-client rate limiter.
    pub fn reset_rate_limits(&self, now: i64) {
        let cfg = self.config.load();
        let mut guard = self.lock();
        let state = &mut *guard;
        rate_limit::reset_windows(&mut state.clients, &state.interner, cfg.dns.rate_limit.count);
        drop(guard);
        self.last_rate_reset.store(now, Ordering::Relaxed);
    }

    /// Remaining seconds of rate limitation for a client, if it is known.
    pub fn rate_limit_turnaround(&self, client_ip: &str, now: i64) -> Option<i64> {
        let cfg = self.config.load();
        let state = self.lock();
        let accrued = state
            .clients
            .iter()
            .find(|c| state.interner.get(c.ip_id) == client_ip)
            .map(|c| c.rate_limit_count)?;
        let elapsed = now - self.last_rate_reset.load(Ordering::Relaxed);
        Some(turnaround(
            accrued,
            cfg.dns.rate_limit.count,
            cfg.dns.rate_limit.interval,
            elapsed,
        ))
    }

    /// Collect every query mutated since the last flush, denormalized for
    /// the mirror, clearing the dirty marks.
    pub fn drain_dirty(&self) -> Vec<QueryRow> {
        let mut state = self.lock();
        let mut rows = Vec::new();
        // Two passes keep the borrow checker happy: snapshot ids first,
        // resolve strings second.
        let ids: Vec<i64> = state
            .ring
            .iter()
            .filter(|q| q.dirty)
            .map(|q| q.id)
            .collect();
        for id in ids {
            let Some(q) = state.ring.get(id) else { continue };
            let forward = q.upstream_id.and_then(|idx| {
                state.upstreams.get(idx).map(|up| {
                    format!("{}#{}", state.interner.get(up.ip_id), up.port)
                })
            });
            rows.push(QueryRow {
                id: q.id,
                timestamp: q.timestamp,
                qtype: q.qtype.code(),
                status: q.status.code(),
                domain: state.interner.get(q.domain_id).to_string(),
                client: state.interner.get(q.client_id).to_string(),
                forward,
                additional_info: q.additional_info.clone(),
                reply_type: q.reply.code(),
                reply_time: q.reply_time_ms,
                dnssec: q.dnssec.code(),
                client_name: q.client_name_id.map(|n| state.interner.get(n).to_string()),
                ttl: q.ttl,
                regex_id: q.regex_id,
            });
            if let Some(q) = state.ring.get_mut(id) {
                q.dirty = false;
            }
        }
        rows
    }

    /// Explicit flush (resolver log rotation): drop all state atomically.
    /// The only operation allowed to shrink the interner arena.
    pub fn flush_all(&self, now: i64) {
        let cfg = self.config.load();
        let mut state = self.lock();
        info!("Resetting in-memory telemetry after log flush");
        *state = CoreState::new(cfg.dns.ring_capacity, cfg.api.max_history, now);
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters.clone()
    }

    pub fn query(&self, id: i64) -> Option<QueryRecord> {
        self.lock().ring.get(id).cloned()
    }

    pub fn live_queries(&self) -> usize {
        self.lock().ring.len()
    }

    pub fn next_query_id(&self) -> i64 {
        self.lock().ring.next_id()
    }

    pub fn stats_summary(&self) -> StatsSummary {
        let state = self.lock();
        let c = &state.counters;
        let total = c.queries;
        let blocked = c.blocked();
        StatsSummary {
            total,
            blocked,
            percent_blocked: if total > 0 {
                blocked as f64 * 100.0 / total as f64
            } else {
                0.0
            },
            cached: c.cached(),
            forwarded: c.forwarded(),
            unique_domains: state.domains.len(),
            unique_clients: state.clients.len(),
            by_type: QueryType::ALL
                .iter()
                .map(|t| (t.as_str(), c.type_count(*t)))
                .collect(),
            by_status: QueryStatus::ALL
                .iter()
                .map(|s| (s.as_str(), c.status_count(*s)))
                .collect(),
            by_reply: ReplyType::ALL
                .iter()
                .map(|r| (r.as_str(), c.reply_count(*r)))
                .collect(),
        }
    }

    pub fn history(&self) -> Vec<HistorySlot> {
        let state = self.lock();
        state
            .overtime
            .iter()
            .map(|s| HistorySlot {
                timestamp: s.start_time,
                total: s.total,
                blocked: s.blocked,
                cached: s.cached,
                forwarded: s.forwarded,
            })
            .collect()
    }

    /// Per-client overtime columns for the busiest `top` clients; everyone
    /// else is folded into a trailing "other" series.
    pub fn client_history(&self, top: usize) -> ClientHistory {
        let state = self.lock();
        let mut order: Vec<usize> = (0..state.clients.len()).collect();
        order.sort_by_key(|&i| {
            std::cmp::Reverse(state.clients.get(i).map(|c| c.count).unwrap_or(0))
        });

        let slots = state.overtime.slot_count();
        let mut names = Vec::new();
        let mut series: Vec<Vec<i64>> = Vec::new();
        let mut other = vec![0i64; slots];

        for (rank, &idx) in order.iter().enumerate() {
            let Some(client) = state.clients.get(idx) else { continue };
            if rank < top {
                names.push(state.interner.get(client.ip_id).to_string());
                series.push(client.overtime.iter().copied().collect());
            } else {
                for (slot, v) in client.overtime.iter().enumerate() {
                    other[slot] += v;
                }
            }
        }

        ClientHistory {
            timestamps: state.overtime.iter().map(|s| s.start_time).collect(),
            clients: names,
            series,
            other,
        }
    }

    pub fn overtime_sums(&self) -> (i64, i64) {
        let state = self.lock();
        (state.overtime.total_sum(), state.overtime.blocked_sum())
    }

    /// Aggregate snapshot of one domain, for tests and the stats API.
    pub fn domain_counts(&self, name: &str) -> Option<(i64, i64)> {
        let state = self.lock();
        let result = state
            .domains
            .iter()
            .find(|d| state.interner.get(d.name_id) == name)
            .map(|d| (d.count, d.blocked_count));
        result
    }

    pub fn client_counts(&self, ip: &str) -> Option<(i64, i64, bool)> {
        let state = self.lock();
        let result = state
            .clients
            .iter()
            .find(|c| state.interner.get(c.ip_id) == ip)
            .map(|c| (c.count, c.blocked_count, c.flags.rate_limited));
        result
    }

    pub fn upstream_counts(&self, ip: &str, port: u16) -> Option<(i64, i64)> {
        let state = self.lock();
        let result = state
            .upstreams
            .iter()
            .find(|u| u.port == port && state.interner.get(u.ip_id) == ip)
            .map(|u| (u.count, u.failed_count));
        result
    }
}

#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub total: i64,
    pub blocked: i64,
    pub percent_blocked: f64,
    pub cached: i64,
    pub forwarded: i64,
    pub unique_domains: usize,
    pub unique_clients: usize,
    pub by_type: Vec<(&'static str, i64)>,
    pub by_status: Vec<(&'static str, i64)>,
    pub by_reply: Vec<(&'static str, i64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct HistorySlot {
    pub timestamp: i64,
    pub total: i64,
    pub blocked: i64,
    pub cached: i64,
    pub forwarded: i64,
}

#[derive(Debug, Clone)]
pub struct ClientHistory {
    pub timestamps: Vec<i64>,
    pub clients: Vec<String>,
    pub series: Vec<Vec<i64>>,
    pub other: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_dns_domain::ExternalBlockKind;

    fn test_core() -> Core {
        let mut config = Config::default();
        config.dns.ring_capacity = 1024;
        config.dns.rate_limit.count = 5;
        config.dns.rate_limit.interval = 60;
        config.api.max_history = 7200;
        let config = Arc::new(ArcSwap::from_pointee(config));
        Core::new(config, 1_000_000)
    }

    fn start(ts: f64, domain: &str, client: &str) -> QueryStart {
        QueryStart {
            timestamp: ts,
            qtype: QueryType::A,
            domain: domain.to_string(),
            client_ip: client.to_string(),
            client_name: None,
        }
    }

    fn assert_counter_invariants(core: &Core) {
        let c = core.counters();
        assert_eq!(c.status_sum(), c.queries, "status sum mismatch");
        assert_eq!(c.type_sum(), c.queries, "type sum mismatch");
    }

    #[test]
    fn admission_updates_all_aggregates() {
        let core = test_core();
        let (id, verdict) = core.admit(start(1_000_000.0, "Example.COM", "10.0.0.1"));
        assert_eq!(verdict, Verdict::Allow);
        let q = core.query(id).unwrap();
        assert_eq!(q.status, QueryStatus::Unknown);
        assert_eq!(core.domain_counts("example.com"), Some((1, 0)));
        assert_eq!(core.client_counts("10.0.0.1"), Some((1, 0, false)));
        assert_eq!(core.overtime_sums(), (1, 0));
        assert_counter_invariants(&core);
    }

    #[test]
    fn gravity_block_is_counted_everywhere() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "ad.example", "10.0.0.1"));
        core.apply(id, DnsEvent::Gravity { deep_cname: false });

        let q = core.query(id).unwrap();
        assert_eq!(q.status, QueryStatus::Gravity);
        assert_eq!(core.domain_counts("ad.example"), Some((1, 1)));
        assert_eq!(core.client_counts("10.0.0.1"), Some((1, 1, false)));
        assert_eq!(core.overtime_sums(), (1, 1));
        assert_counter_invariants(&core);
    }

    #[test]
    fn gravity_locks_out_forward_but_not_cname_upgrade() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "ad.example", "10.0.0.1"));
        core.apply(id, DnsEvent::Gravity { deep_cname: false });
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "9.9.9.9".into(),
                port: 53,
            },
        );
        assert_eq!(core.query(id).unwrap().status, QueryStatus::Gravity);

        core.apply(id, DnsEvent::Gravity { deep_cname: true });
        let q = core.query(id).unwrap();
        assert_eq!(q.status, QueryStatus::GravityCname);
        assert!(q.flags.cname_from_deep_inspect);
        // Still exactly one blocked query
        assert_eq!(core.domain_counts("ad.example"), Some((1, 1)));
        assert_counter_invariants(&core);
    }

    #[test]
    fn cache_overtakes_inflight_forward_only() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "a.example", "10.0.0.1"));
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "9.9.9.9".into(),
                port: 53,
            },
        );
        core.apply(
            id,
            DnsEvent::CacheHit {
                stale: false,
                timestamp: 1_000_000.1,
            },
        );
        assert_eq!(core.query(id).unwrap().status, QueryStatus::Cache);

        // Completed forward is not overtaken
        let (id2, _) = core.admit(start(1_000_001.0, "b.example", "10.0.0.1"));
        core.apply(
            id2,
            DnsEvent::Forwarded {
                upstream: "9.9.9.9".into(),
                port: 53,
            },
        );
        core.apply(
            id2,
            DnsEvent::Reply {
                reply: ReplyType::Ip,
                reply_time_ms: 12.0,
                ttl: 300,
            },
        );
        core.apply(
            id2,
            DnsEvent::CacheHit {
                stale: false,
                timestamp: 1_000_001.5,
            },
        );
        assert_eq!(core.query(id2).unwrap().status, QueryStatus::Forwarded);
        assert_counter_invariants(&core);
    }

    #[test]
    fn external_block_supersedes_forward() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "x.example", "10.0.0.1"));
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "8.8.8.8".into(),
                port: 53,
            },
        );
        core.apply(
            id,
            DnsEvent::ExternalBlocked {
                kind: ExternalBlockKind::Nxra,
            },
        );
        assert_eq!(
            core.query(id).unwrap().status,
            QueryStatus::ExternalBlockedNxra
        );
        // Forward after external block is ignored
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "8.8.8.8".into(),
                port: 53,
            },
        );
        assert_eq!(
            core.query(id).unwrap().status,
            QueryStatus::ExternalBlockedNxra
        );
        assert_counter_invariants(&core);
    }

    #[test]
    fn retry_does_not_double_count_upstream() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "r.example", "10.0.0.1"));
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "8.8.8.8".into(),
                port: 53,
            },
        );
        core.apply(id, DnsEvent::Retried { dnssec: false });
        assert_eq!(core.query(id).unwrap().status, QueryStatus::Retried);
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "8.8.8.8".into(),
                port: 53,
            },
        );
        assert_eq!(core.upstream_counts("8.8.8.8", 53), Some((1, 0)));
        assert_eq!(core.query(id).unwrap().status, QueryStatus::Forwarded);
        assert_counter_invariants(&core);
    }

    #[test]
    fn in_progress_requires_explicit_tag() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "p.example", "10.0.0.1"));
        core.apply(id, DnsEvent::InProgress);
        assert_eq!(core.query(id).unwrap().status, QueryStatus::InProgress);
        assert_counter_invariants(&core);
    }

    #[test]
    fn sixth_query_is_rate_limited() {
        let core = test_core();
        let mut verdicts = Vec::new();
        for i in 0..6 {
            let (_, v) = core.admit(start(1_000_000.0 + i as f64 * 0.1, "q.example", "10.0.0.9"));
            verdicts.push(v);
        }
        assert!(matches!(verdicts[4], Verdict::Allow));
        assert!(matches!(verdicts[5], Verdict::Refuse { .. }));
        let (_, _, limited) = core.client_counts("10.0.0.9").unwrap();
        assert!(limited);

        let t = core
            .rate_limit_turnaround("10.0.0.9", 1_000_001)
            .unwrap();
        assert!(t > 0 && t <= 60, "turnaround {t} out of range");
        assert_counter_invariants(&core);
    }

    #[test]
    fn rate_limit_window_reset_unflags_quiet_clients() {
        let core = test_core();
        for i in 0..7 {
            core.admit(start(1_000_000.0 + i as f64 * 0.1, "q.example", "10.0.0.9"));
        }
        core.reset_rate_limits(1_000_060);
        let (_, _, limited) = core.client_counts("10.0.0.9").unwrap();
        assert!(!limited);
        // Next query is allowed again
        let (_, v) = core.admit(start(1_000_060.5, "q.example", "10.0.0.9"));
        assert!(matches!(v, Verdict::Allow));
    }

    #[test]
    fn db_busy_routes_to_dbbusy_status() {
        let core = test_core();
        core.set_db_busy(true);
        let (id, v) = core.admit(start(1_000_000.0, "busy.example", "10.0.0.1"));
        assert!(matches!(v, Verdict::Refuse { .. }));
        let q = core.query(id).unwrap();
        assert_eq!(q.status, QueryStatus::DbBusy);
        assert_eq!(q.reply, ReplyType::Refused);
        // DBBUSY is a blocked status
        assert_eq!(core.overtime_sums(), (1, 1));
        assert_counter_invariants(&core);
    }

    #[test]
    fn gc_empties_everything_past_mintime() {
        let core = test_core();
        let base = 1_000_000.0;
        for i in 0..50 {
            let (id, _) = core.admit(start(base + i as f64, "gc.example", "10.0.0.2"));
            if i % 2 == 0 {
                core.apply(id, DnsEvent::Gravity { deep_cname: false });
            }
        }
        assert_eq!(core.counters().queries, 50);

        let mintime = align_bucket(base as i64 + 10_000);
        let removed = core.gc_teardown(mintime);
        assert_eq!(removed, 50);
        core.gc_compact(mintime, removed);

        let c = core.counters();
        assert_eq!(c.queries, 0);
        assert_eq!(c.status_sum(), 0);
        assert_eq!(c.type_sum(), 0);
        assert_eq!(core.live_queries(), 0);
        assert_eq!(core.overtime_sums(), (0, 0));
        assert_eq!(core.domain_counts("gc.example"), Some((0, 0)));
        assert_eq!(core.client_counts("10.0.0.2"), Some((0, 0, false)));
    }

    #[test]
    fn gc_keeps_queries_newer_than_mintime() {
        let core = test_core();
        core.admit(start(1_000_000.0, "old.example", "10.0.0.1"));
        core.admit(start(1_003_000.0, "new.example", "10.0.0.1"));

        let mintime = align_bucket(1_000_600);
        let removed = core.gc_teardown(mintime);
        assert_eq!(removed, 1);
        core.gc_compact(mintime, removed);

        assert_eq!(core.counters().queries, 1);
        assert_eq!(core.domain_counts("old.example"), Some((0, 0)));
        assert_eq!(core.domain_counts("new.example"), Some((1, 0)));
        assert_counter_invariants(&core);
    }

    #[test]
    fn full_ring_retires_oldest_on_admit() {
        let mut config = Config::default();
        config.dns.ring_capacity = 4;
        config.dns.rate_limit.count = 0;
        config.api.max_history = 7200;
        let core = Core::new(Arc::new(ArcSwap::from_pointee(config)), 1_000_000);

        for i in 0..6 {
            core.admit(start(1_000_000.0 + i as f64, "ring.example", "10.0.0.3"));
        }
        assert_eq!(core.live_queries(), 4);
        assert_eq!(core.counters().queries, 4);
        assert_eq!(core.domain_counts("ring.example"), Some((4, 0)));
        assert!(core.query(1).is_none());
        assert!(core.query(3).is_some());
        assert_counter_invariants(&core);
    }

    #[test]
    fn drain_dirty_denormalizes_and_clears() {
        let core = test_core();
        let (id, _) = core.admit(start(1_000_000.0, "flush.example", "10.0.0.1"));
        core.apply(
            id,
            DnsEvent::Forwarded {
                upstream: "8.8.4.4".into(),
                port: 53,
            },
        );
        let rows = core.drain_dirty();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].domain, "flush.example");
        assert_eq!(rows[0].forward.as_deref(), Some("8.8.4.4#53"));
        assert!(core.drain_dirty().is_empty());

        // A later status change re-marks the row
        core.apply(id, DnsEvent::Gravity { deep_cname: false });
        assert_eq!(core.drain_dirty().len(), 1);
    }

    #[test]
    fn privacy_maximum_hides_domains_and_clients() {
        let mut config = Config::default();
        config.api.privacy_level = PrivacyLevel::Maximum;
        let core = Core::new(Arc::new(ArcSwap::from_pointee(config)), 1_000_000);
        core.admit(start(1_000_000.0, "secret.example", "10.9.9.9"));
        assert!(core.domain_counts("secret.example").is_none());
        assert!(core.client_counts("10.9.9.9").is_none());
        assert_eq!(core.domain_counts("hidden"), Some((1, 0)));
        assert_counter_invariants(&core);
    }

    #[test]
    fn flush_all_resets_atomically() {
        let core = test_core();
        for i in 0..10 {
            core.admit(start(1_000_000.0 + i as f64, "f.example", "10.0.0.1"));
        }
        core.flush_all(1_000_100);
        assert_eq!(core.counters().queries, 0);
        assert_eq!(core.live_queries(), 0);
        assert!(core.domain_counts("f.example").is_none());
    }
}
