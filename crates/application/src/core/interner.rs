use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};
use vigil_dns_domain::StringId;

/// Append-only string arena with a hash index.
///
/// Interning is idempotent: equal bytes map to equal handles. Handles are
/// never reused; the arena only shrinks on an explicit engine flush, which
/// tears down every structure referencing it in the same critical section.
#[derive(Debug, Default)]
pub struct StringInterner {
    arena: String,
    spans: Vec<(u32, u32)>,
    index: FxHashMap<u64, Vec<u32>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        let hash = hash_bytes(s.as_bytes());
        if let Some(candidates) = self.index.get(&hash) {
            for &handle in candidates {
                if self.lookup(handle) == s {
                    return StringId(handle);
                }
            }
        }

        let offset = self.arena.len() as u32;
        self.arena.push_str(s);
        let handle = self.spans.len() as u32;
        self.spans.push((offset, s.len() as u32));
        self.index.entry(hash).or_default().push(handle);
        StringId(handle)
    }

    pub fn get(&self, id: StringId) -> &str {
        self.lookup(id.0)
    }

    fn lookup(&self, handle: u32) -> &str {
        let (offset, len) = self.spans[handle as usize];
        &self.arena[offset as usize..(offset + len) as usize]
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Discard everything. Only valid as part of a full engine flush.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.spans.clear();
        self.index.clear();
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}
