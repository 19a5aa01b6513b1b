use std::collections::VecDeque;
use vigil_dns_domain::query_type::TYPE_COUNT;
use vigil_dns_domain::QueryType;

/// Width of one overtime slot in seconds.
pub const BUCKET_SECS: i64 = 600;

/// Slots kept ahead of "now" so queries keep landing correctly between two
/// garbage-collection runs; the GC shift keeps the headroom replenished.
const HEADROOM_SLOTS: usize = 6;

#[derive(Debug, Clone)]
pub struct OverTimeSlot {
    pub start_time: i64,
    pub total: i64,
    pub blocked: i64,
    pub cached: i64,
    pub forwarded: i64,
    pub per_type: [i64; TYPE_COUNT],
}

impl OverTimeSlot {
    fn zeroed(start_time: i64) -> Self {
        Self {
            start_time,
            total: 0,
            blocked: 0,
            cached: 0,
            forwarded: 0,
            per_type: [0; TYPE_COUNT],
        }
    }
}

pub fn align_bucket(ts: i64) -> i64 {
    ts - ts.rem_euclid(BUCKET_SECS)
}

/// Ring of 10-minute aggregate slots covering `max_history` seconds plus a
/// little future headroom. The slot count is fixed for the process lifetime;
/// only the GC shifts the window, which keeps the per-client mirrors in the
/// client table aligned by shifting them the same number of slots.
///
/// A timestamp landing exactly on a slot boundary belongs to the slot that
/// starts there, not the previous one.
#[derive(Debug)]
pub struct OverTime {
    slots: VecDeque<OverTimeSlot>,
}

impl OverTime {
    pub fn new(max_history: u64, now: i64) -> Self {
        let history_slots = (max_history as i64 / BUCKET_SECS).max(1) as usize;
        let n = history_slots + HEADROOM_SLOTS;
        let oldest = align_bucket(now) - (history_slots as i64 - 1) * BUCKET_SECS;
        let mut slots = VecDeque::with_capacity(n);
        for i in 0..n {
            slots.push_back(OverTimeSlot::zeroed(oldest + i as i64 * BUCKET_SECS));
        }
        Self { slots }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn oldest_start(&self) -> i64 {
        self.slots.front().map(|s| s.start_time).unwrap_or(0)
    }

    pub fn newest_start(&self) -> i64 {
        self.slots.back().map(|s| s.start_time).unwrap_or(0)
    }

    /// Index of the slot covering `ts`. Timestamps outside the window clamp
    /// to the nearest end.
    pub fn slot_index(&self, ts: f64) -> usize {
        let aligned = align_bucket(ts.floor() as i64);
        if aligned <= self.oldest_start() {
            return 0;
        }
        let idx = ((aligned - self.oldest_start()) / BUCKET_SECS) as usize;
        idx.min(self.slots.len() - 1)
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut OverTimeSlot {
        &mut self.slots[idx]
    }

    pub fn get(&self, idx: usize) -> Option<&OverTimeSlot> {
        self.slots.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverTimeSlot> {
        self.slots.iter()
    }

    pub fn record_query(&mut self, ts: f64, qtype: QueryType) -> usize {
        let idx = self.slot_index(ts);
        let slot = &mut self.slots[idx];
        slot.total += 1;
        slot.per_type[qtype.code() as usize] += 1;
        idx
    }

    pub fn unrecord_query(&mut self, ts: f64, qtype: QueryType) -> usize {
        let idx = self.slot_index(ts);
        let slot = &mut self.slots[idx];
        slot.total -= 1;
        slot.per_type[qtype.code() as usize] -= 1;
        idx
    }

    /// Shift the ring so no slot older than `mintime` survives; freed slots
    /// reappear zeroed at the tip. Returns how many slots were dropped, so
    /// per-client mirrors can be shifted by the same amount.
    pub fn shift(&mut self, mintime: i64) -> usize {
        let cutoff = align_bucket(mintime);
        let mut dropped = 0;
        while self
            .slots
            .front()
            .map(|s| s.start_time < cutoff)
            .unwrap_or(false)
        {
            let next_start = self.newest_start() + BUCKET_SECS;
            self.slots.pop_front();
            self.slots.push_back(OverTimeSlot::zeroed(next_start));
            dropped += 1;
        }
        dropped
    }

    pub fn total_sum(&self) -> i64 {
        self.slots.iter().map(|s| s.total).sum()
    }

    pub fn blocked_sum(&self) -> i64 {
        self.slots.iter().map(|s| s.blocked).sum()
    }
}
