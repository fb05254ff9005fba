use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

#[derive(Debug, Default)]
struct CacheEntry {
    refs: usize,
    data: Option<Bytes>,
}

/// Reference-counted store of decompressed chunk payloads, keyed by GUID.
///
/// Every file part referencing a chunk registers once during manifest
/// ingestion and releases exactly once when its job reaches a terminal
/// state. The payload is evicted the moment the outstanding count drops
/// below one; the map never holds an entry whose count is zero. Only the
/// map operations run under the lock; network I/O and decompression
/// happen elsewhere.
#[derive(Debug, Default)]
pub struct ChunkCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one future consumer of `guid`.
    pub fn register(&self, guid: &str) {
        self.lock().entry(guid.to_string()).or_default().refs += 1;
    }

    /// Shared snapshot of the cached payload, if present.
    pub fn get(&self, guid: &str) -> Option<Bytes> {
        self.lock().get(guid).and_then(|entry| entry.data.clone())
    }

    /// Keep `payload` for later consumers. Dropped unless more than one
    /// reference is still outstanding. Callers must pass the decompressed
    /// payload with the wire header already stripped.
    pub fn store(&self, guid: &str, payload: Bytes) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(guid) {
            if entry.refs > 1 {
                entry.data = Some(payload);
            }
        }
    }

    /// Drop one reference; the entry goes away when none remain.
    pub fn release(&self, guid: &str) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(guid) {
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs < 1 {
                entries.remove(guid);
            }
        }
    }

    /// True once every registered reference has been released.
    pub fn is_drained(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of payloads currently held.
    pub fn cached_payloads(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| entry.data.is_some())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().expect("chunk cache lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID: &str = "0123456789ABCDEF0123456789ABCDEF";

    #[test]
    fn store_is_dropped_with_single_reference() {
        let cache = ChunkCache::new();
        cache.register(GUID);
        cache.store(GUID, Bytes::from_static(b"payload"));
        assert_eq!(cache.get(GUID), None);
        assert_eq!(cache.cached_payloads(), 0);
    }

    #[test]
    fn store_is_kept_while_other_consumers_remain() {
        let cache = ChunkCache::new();
        cache.register(GUID);
        cache.register(GUID);
        cache.store(GUID, Bytes::from_static(b"payload"));
        assert_eq!(cache.get(GUID).unwrap(), Bytes::from_static(b"payload"));
        assert_eq!(cache.cached_payloads(), 1);
    }

    #[test]
    fn release_evicts_at_zero() {
        let cache = ChunkCache::new();
        cache.register(GUID);
        cache.register(GUID);
        cache.store(GUID, Bytes::from_static(b"payload"));

        cache.release(GUID);
        assert!(cache.get(GUID).is_some(), "one consumer still outstanding");
        assert!(!cache.is_drained());

        cache.release(GUID);
        assert_eq!(cache.get(GUID), None);
        assert!(cache.is_drained(), "entry removed once refs hit zero");
    }

    #[test]
    fn store_without_registration_is_ignored() {
        let cache = ChunkCache::new();
        cache.store(GUID, Bytes::from_static(b"payload"));
        assert_eq!(cache.get(GUID), None);
        assert!(cache.is_drained());
    }

    #[test]
    fn release_balances_across_skipped_files() {
        // a pre-existing file releases its parts without ever storing
        let cache = ChunkCache::new();
        for _ in 0..3 {
            cache.register(GUID);
        }
        for _ in 0..3 {
            cache.release(GUID);
        }
        assert!(cache.is_drained());
    }

    #[test]
    fn snapshots_share_the_same_bytes() {
        let cache = ChunkCache::new();
        cache.register(GUID);
        cache.register(GUID);
        let payload = Bytes::from(vec![7u8; 1024]);
        cache.store(GUID, payload.clone());

        let a = cache.get(GUID).unwrap();
        let b = cache.get(GUID).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, payload);
    }
}
