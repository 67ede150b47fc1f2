//! In-process TTL cache.
//!
//! Constructed explicitly and handed to the services that need it. Writes are
//! last-writer-wins; two audits racing on the same key may both compute a
//! value, and whichever lands last is kept. Expired entries are swept on the
//! write path every `SWEEP_EVERY` inserts, so keys that are never read again
//! still leave the map.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const SWEEP_EVERY: usize = 32;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    sweep_every: usize,
    inserts: AtomicUsize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_every: SWEEP_EVERY,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn with_sweep_every(mut self, inserts: usize) -> Self {
        self.sweep_every = inserts.max(1);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached value. Returns None if missing or expired; expired
    /// entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let hit = self.entries.get(key).and_then(|entry| {
            if entry.stored_at.elapsed() < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        if hit.is_none() {
            self.entries
                .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        }

        hit
    }

    /// Store a value (upsert), restarting its TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let count = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.sweep_every == 0 {
            self.evict_expired();
        }

        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Delete expired entries, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            log::debug!("[CACHE] Evicted {} expired entries", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
