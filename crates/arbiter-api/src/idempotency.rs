//! # Idempotency Cache
//!
//! Bounded map from [`IdempotencyKey`] to the response already produced for
//! it. When the cache reaches capacity the oldest half, by insertion order,
//! is evicted in one pass.
//!
//! The lock is `parking_lot` and is never held across an `.await`.

use std::collections::HashMap;

use arbiter_advisory::AdvisoryResponse;
use arbiter_core::IdempotencyKey;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<IdempotencyKey, (u64, AdvisoryResponse)>,
    next_seq: u64,
}

/// Bounded idempotency cache.
#[derive(Debug)]
pub struct IdempotencyCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl IdempotencyCache {
    /// Create a cache holding at most `capacity` responses (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// The cached response for `key`, if any.
    pub fn get(&self, key: &IdempotencyKey) -> Option<AdvisoryResponse> {
        self.inner.lock().entries.get(key).map(|(_, r)| r.clone())
    }

    /// Cache `response` under `key`. A key that is already present keeps its
    /// first response.
    ///
    /// Returns the stored response and whether this call stored it. `false`
    /// means a concurrent call with the same key got there first.
    pub fn insert(
        &self,
        key: IdempotencyKey,
        response: AdvisoryResponse,
    ) -> (AdvisoryResponse, bool) {
        let mut inner = self.inner.lock();
        if let Some((_, existing)) = inner.entries.get(&key) {
            return (existing.clone(), false);
        }
        if inner.entries.len() >= self.capacity {
            evict_oldest_half(&mut inner);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, (seq, response.clone()));
        (response, true)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_oldest_half(inner: &mut CacheInner) {
    let mut seqs: Vec<u64> = inner.entries.values().map(|(seq, _)| *seq).collect();
    seqs.sort_unstable();
    let evict = seqs.len().div_ceil(2);
    let Some(&cutoff) = seqs.get(evict.saturating_sub(1)) else {
        return;
    };
    inner.entries.retain(|_, (seq, _)| *seq > cutoff);
    tracing::debug!(evicted = evict, remaining = inner.entries.len(), "idempotency cache trimmed");
}
