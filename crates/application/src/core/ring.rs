use std::collections::VecDeque;
use vigil_dns_domain::QueryRecord;

/// Bounded buffer of recent queries, oldest first, indexed by the monotonic
/// query id. Ids below the base have been aged out and are only available
/// from the SQL mirror.
#[derive(Debug)]
pub struct QueryRing {
    records: VecDeque<QueryRecord>,
    capacity: usize,
    next_id: i64,
}

impl QueryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == self.capacity
    }

    /// Id the next admitted query will receive.
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Id of the oldest query still in memory.
    pub fn base_id(&self) -> i64 {
        self.next_id - self.records.len() as i64
    }

    /// Admit a query. The caller must have made room first when the ring is
    /// full; admission on a full ring is a programming error.
    pub fn admit(&mut self, mut record: QueryRecord) -> i64 {
        debug_assert!(!self.is_full());
        let id = self.next_id;
        self.next_id += 1;
        record.id = id;
        self.records.push_back(record);
        id
    }

    pub fn get(&self, id: i64) -> Option<&QueryRecord> {
        let idx = self.offset(id)?;
        self.records.get(idx)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut QueryRecord> {
        let idx = self.offset(id)?;
        self.records.get_mut(idx)
    }

    pub fn front(&self) -> Option<&QueryRecord> {
        self.records.front()
    }

    /// Drop the `n` oldest queries; the surviving tail moves to the front in
    /// one pass.
    pub fn drop_oldest(&mut self, n: usize) {
        let n = n.min(self.records.len());
        self.records.drain(..n);
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueryRecord> {
        self.records.iter_mut()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn offset(&self, id: i64) -> Option<usize> {
        if id < self.base_id() || id >= self.next_id {
            return None;
        }
        Some((id - self.base_id()) as usize)
    }
}
