use tracing::debug;
use vigil_dns_domain::{DnsEvent, ExternalBlockKind, QueryStatus, ReplyType};

use super::CoreState;

impl CoreState {
    /// The single entry point for status changes. Owns every counter delta:
    /// status counters move here, and crossing the blocked-set boundary
    /// adjusts the overtime bucket, the owning domain and the owning client.
    ///
    /// `IN_PROGRESS` is never entered implicitly; only the explicit event
    /// routes through `allow_in_progress`.
    pub(crate) fn change_status(&mut self, id: i64, new: QueryStatus) {
        self.change_status_inner(id, new, false)
    }

    fn change_status_inner(&mut self, id: i64, new: QueryStatus, allow_in_progress: bool) {
        if new == QueryStatus::InProgress && !allow_in_progress {
            return;
        }
        let Some(q) = self.ring.get(id) else { return };
        let old = q.status;
        if old == new {
            return;
        }
        let ts = q.timestamp;
        let domain_id = q.domain_id;
        let client_id = q.client_id;

        self.counters.status[old.code() as usize] -= 1;
        self.counters.status[new.code() as usize] += 1;

        let bucket = self.overtime.slot_index(ts);
        let slot = self.overtime.slot_mut(bucket);

        if old.is_blocked() != new.is_blocked() {
            let delta: i64 = if new.is_blocked() { 1 } else { -1 };
            slot.blocked += delta;
            if let Some(idx) = self.domains.find(domain_id) {
                if let Some(domain) = self.domains.get_mut(idx) {
                    domain.blocked_count += delta;
                }
            }
            if let Some(idx) = self.clients.find(client_id) {
                if let Some(client) = self.clients.get_mut(idx) {
                    client.blocked_count += delta;
                }
            }
        }
        if old.is_cached() != new.is_cached() {
            slot.cached += if new.is_cached() { 1 } else { -1 };
        }
        if old.is_forwarded() != new.is_forwarded() {
            slot.forwarded += if new.is_forwarded() { 1 } else { -1 };
        }

        if let Some(q) = self.ring.get_mut(id) {
            q.status = new;
            q.dirty = true;
        }
    }

    pub(crate) fn change_reply(&mut self, id: i64, new: ReplyType) {
        let Some(q) = self.ring.get(id) else { return };
        let old = q.reply;
        if old == new {
            return;
        }
        self.counters.reply[old.code() as usize] -= 1;
        self.counters.reply[new.code() as usize] += 1;
        if let Some(q) = self.ring.get_mut(id) {
            q.reply = new;
            q.dirty = true;
        }
    }

    /// Drive one follow-up event through the transition table.
    pub(crate) fn apply_event(&mut self, id: i64, event: DnsEvent) {
        let Some(q) = self.ring.get(id) else {
            debug!(id, "Dropping event for unknown or aged-out query");
            return;
        };
        let status = q.status;
        let complete = q.flags.complete;
        let retry_counted = q.flags.retry_counted;

        match event {
            DnsEvent::Gravity { deep_cname } => {
                self.block_transition(id, status, QueryStatus::Gravity, deep_cname);
            }
            DnsEvent::Denylist { deep_cname } => {
                self.block_transition(id, status, QueryStatus::Denylist, deep_cname);
            }
            DnsEvent::Regex { regex_id, deep_cname } => {
                if let Some(q) = self.ring.get_mut(id) {
                    q.regex_id = Some(regex_id);
                }
                self.block_transition(id, status, QueryStatus::Regex, deep_cname);
            }
            DnsEvent::SpecialDomain => {
                if !is_locked(status) {
                    self.change_status(id, QueryStatus::SpecialDomain);
                }
            }
            DnsEvent::Forwarded { upstream, port } => {
                // External-blocked verdicts and list hits supersede a forward;
                // a cache answer that already landed stays, too.
                if is_locked(status) || is_external_blocked(status) || status.is_cached() {
                    return;
                }
                let ip_id = self.interner.intern(&upstream);
                let upstream_idx = self.upstreams.find_or_create(ip_id, port);
                if retry_counted {
                    // The earlier forward was already counted for this
                    // transaction; do not count the re-send.
                    if let Some(q) = self.ring.get_mut(id) {
                        q.flags.retry_counted = false;
                        q.upstream_id = Some(upstream_idx);
                    }
                } else if let Some(up) = self.upstreams.get_mut(upstream_idx) {
                    up.count += 1;
                    if let Some(q) = self.ring.get_mut(id) {
                        q.upstream_id = Some(upstream_idx);
                    }
                }
                self.change_status(id, QueryStatus::Forwarded);
            }
            DnsEvent::CacheHit { stale, .. } => {
                if is_locked(status) || is_external_blocked(status) {
                    return;
                }
                // A cached answer only overtakes a forward while that forward
                // is still in flight.
                if status.is_forwarded() && complete {
                    return;
                }
                let target = if stale {
                    QueryStatus::CacheStale
                } else {
                    QueryStatus::Cache
                };
                self.change_status(id, target);
            }
            DnsEvent::ExternalBlocked { kind } => {
                if is_locked(status) {
                    return;
                }
                let target = match kind {
                    ExternalBlockKind::Ip => QueryStatus::ExternalBlockedIp,
                    ExternalBlockKind::Null => QueryStatus::ExternalBlockedNull,
                    ExternalBlockKind::Nxra => QueryStatus::ExternalBlockedNxra,
                };
                self.change_status(id, target);
            }
            DnsEvent::Retried { dnssec } => {
                if is_locked(status) || is_external_blocked(status) {
                    return;
                }
                if let Some(q) = self.ring.get_mut(id) {
                    q.flags.retry_counted = true;
                }
                let target = if dnssec {
                    QueryStatus::RetriedDnssec
                } else {
                    QueryStatus::Retried
                };
                self.change_status(id, target);
            }
            DnsEvent::InProgress => {
                if !is_locked(status) && !complete {
                    self.change_status_inner(id, QueryStatus::InProgress, true);
                }
            }
            DnsEvent::Reply {
                reply,
                reply_time_ms,
                ttl,
            } => {
                self.change_reply(id, reply);
                let upstream_id = self.ring.get(id).and_then(|q| q.upstream_id);
                if let Some(q) = self.ring.get_mut(id) {
                    q.reply_time_ms = reply_time_ms;
                    q.ttl = ttl;
                    q.flags.complete = true;
                    q.dirty = true;
                }
                if status.is_forwarded() {
                    if let Some(up) = upstream_id.and_then(|i| self.upstreams.get_mut(i)) {
                        up.rtt_sum += reply_time_ms;
                        // Running mean absolute deviation around the mean RTT
                        let mean = up.rtt_sum / up.count.max(1) as f64;
                        up.rtt_uncertainty += (reply_time_ms - mean).abs();
                        if reply.is_failure() {
                            up.failed_count += 1;
                        }
                    }
                }
            }
            DnsEvent::Dnssec { status: dnssec } => {
                let Some(q) = self.ring.get(id) else { return };
                let old = q.dnssec;
                if old == dnssec {
                    return;
                }
                self.counters.dnssec[old.code() as usize] -= 1;
                self.counters.dnssec[dnssec.code() as usize] += 1;
                if let Some(q) = self.ring.get_mut(id) {
                    q.dnssec = dnssec;
                    q.dirty = true;
                }
            }
        }
    }

    /// Shared path for gravity/denylist/regex verdicts. A plain hit locks the
    /// query; only the deep-inspection CNAME variants may upgrade it after
    /// that.
    fn block_transition(
        &mut self,
        id: i64,
        current: QueryStatus,
        base: QueryStatus,
        deep_cname: bool,
    ) {
        if current.is_cname_variant() {
            return;
        }
        if is_locked(current) && !deep_cname {
            return;
        }
        let target = if deep_cname {
            base.cname_variant().unwrap_or(base)
        } else {
            base
        };
        if deep_cname {
            if let Some(q) = self.ring.get_mut(id) {
                q.flags.cname_from_deep_inspect = true;
            }
        }
        self.change_status(id, target);
    }
}

/// List verdicts are final apart from their CNAME upgrades.
fn is_locked(status: QueryStatus) -> bool {
    matches!(
        status,
        QueryStatus::Gravity | QueryStatus::Regex | QueryStatus::Denylist
    ) || status.is_cname_variant()
        || matches!(status, QueryStatus::SpecialDomain | QueryStatus::DbBusy)
}

fn is_external_blocked(status: QueryStatus) -> bool {
    matches!(
        status,
        QueryStatus::ExternalBlockedIp
            | QueryStatus::ExternalBlockedNull
            | QueryStatus::ExternalBlockedNxra
    )
}
