use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use vigil_dns_domain::StringId;

#[derive(Debug, Clone)]
pub struct DomainRecord {
    pub name_id: StringId,
    pub count: i64,
    pub blocked_count: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientFlags {
    pub rate_limited: bool,
    pub aliased: bool,
}

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub ip_id: StringId,
    pub name_id: Option<StringId>,
    pub mac_id: Option<StringId>,
    pub first_seen: f64,
    pub last_query: f64,
    pub count: i64,
    pub blocked_count: i64,
    /// Per-client mirror of the overtime ring; shifted together with it.
    pub overtime: VecDeque<i64>,
    pub rate_limit_count: u32,
    pub flags: ClientFlags,
    pub alias_parent_id: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct UpstreamRecord {
    pub ip_id: StringId,
    pub name_id: Option<StringId>,
    pub port: u16,
    pub count: i64,
    pub failed_count: i64,
    pub rtt_sum: f64,
    pub rtt_uncertainty: f64,
}

/// Append-only record vector plus a hash index over the key handle.
/// Records live until process exit or an explicit engine flush.
#[derive(Debug, Default)]
pub struct DomainTable {
    records: Vec<DomainRecord>,
    index: FxHashMap<StringId, usize>,
}

impl DomainTable {
    pub fn find_or_create(&mut self, name_id: StringId) -> usize {
        if let Some(&idx) = self.index.get(&name_id) {
            return idx;
        }
        let idx = self.records.len();
        self.records.push(DomainRecord {
            name_id,
            count: 0,
            blocked_count: 0,
        });
        self.index.insert(name_id, idx);
        idx
    }

    pub fn find(&self, name_id: StringId) -> Option<usize> {
        self.index.get(&name_id).copied()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut DomainRecord> {
        self.records.get_mut(idx)
    }

    pub fn get(&self, idx: usize) -> Option<&DomainRecord> {
        self.records.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

#[derive(Debug, Default)]
pub struct ClientTable {
    records: Vec<ClientRecord>,
    index: FxHashMap<StringId, usize>,
}

impl ClientTable {
    pub fn find_or_create(&mut self, ip_id: StringId, now: f64, overtime_slots: usize) -> usize {
        if let Some(&idx) = self.index.get(&ip_id) {
            return idx;
        }
        let idx = self.records.len();
        self.records.push(ClientRecord {
            ip_id,
            name_id: None,
            mac_id: None,
            first_seen: now,
            last_query: now,
            count: 0,
            blocked_count: 0,
            overtime: VecDeque::from(vec![0; overtime_slots]),
            rate_limit_count: 0,
            flags: ClientFlags::default(),
            alias_parent_id: None,
        });
        self.index.insert(ip_id, idx);
        idx
    }

    pub fn find(&self, ip_id: StringId) -> Option<usize> {
        self.index.get(&ip_id).copied()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut ClientRecord> {
        self.records.get_mut(idx)
    }

    pub fn get(&self, idx: usize) -> Option<&ClientRecord> {
        self.records.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

#[derive(Debug, Default)]
pub struct UpstreamTable {
    records: Vec<UpstreamRecord>,
    index: FxHashMap<(StringId, u16), usize>,
}

impl UpstreamTable {
    pub fn find_or_create(&mut self, ip_id: StringId, port: u16) -> usize {
        if let Some(&idx) = self.index.get(&(ip_id, port)) {
            return idx;
        }
        let idx = self.records.len();
        self.records.push(UpstreamRecord {
            ip_id,
            name_id: None,
            port,
            count: 0,
            failed_count: 0,
            rtt_sum: 0.0,
            rtt_uncertainty: 0.0,
        });
        self.index.insert((ip_id, port), idx);
        idx
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut UpstreamRecord> {
        self.records.get_mut(idx)
    }

    pub fn get(&self, idx: usize) -> Option<&UpstreamRecord> {
        self.records.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpstreamRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_table_deduplicates_by_handle() {
        let mut table = DomainTable::default();
        let a = table.find_or_create(StringId(0));
        let b = table.find_or_create(StringId(0));
        let c = table.find_or_create(StringId(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn upstream_table_keys_on_ip_and_port() {
        let mut table = UpstreamTable::default();
        let a = table.find_or_create(StringId(7), 53);
        let b = table.find_or_create(StringId(7), 5353);
        assert_ne!(a, b);
        assert_eq!(table.find_or_create(StringId(7), 53), a);
    }

    #[test]
    fn client_first_seen_is_set_once() {
        let mut table = ClientTable::default();
        let idx = table.find_or_create(StringId(3), 1000.0, 144);
        let again = table.find_or_create(StringId(3), 2000.0, 144);
        assert_eq!(idx, again);
        assert_eq!(table.get(idx).unwrap().first_seen, 1000.0);
        assert_eq!(table.get(idx).unwrap().overtime.len(), 144);
    }
}
