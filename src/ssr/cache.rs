//! Bounded SSR response cache with per-entry TTL.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};
use wire::SsrResponse;

use crate::config::FALLBACK_SSR_CACHE_MAX_ENTRIES;
use crate::session::bytes_to_hex;

struct Entry {
    value: SsrResponse,
    expires_at: Instant,
}

pub struct SsrCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, Entry>>,
}

impl SsrCache {
    /// `None` when `ttl` is zero. A zero bound falls back to 256 entries.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }
        let bound = if max_entries == 0 { FALLBACK_SSR_CACHE_MAX_ENTRIES } else { max_entries };
        let capacity = NonZeroUsize::new(bound)?;
        Some(Self { ttl, entries: Mutex::new(LruCache::new(capacity)) })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<SsrResponse> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: String, value: SsrResponse) {
        self.insert_at(key, value, Instant::now());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<SsrResponse> {
        let mut entries = self.lock();
        let expired = entries.peek(key)?.expires_at <= now;
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub(crate) fn insert_at(&self, key: String, value: SsrResponse, now: Instant) {
        let mut entries = self.lock();
        if !entries.contains(&key) && entries.len() >= entries.cap().get() {
            // Expired entries go first, least recently used among them.
            let stale = entries.iter().rev().find(|(_, entry)| entry.expires_at <= now).map(|(k, _)| k.clone());
            if let Some(stale) = stale {
                entries.pop(&stale);
            }
        }
        entries.put(key, Entry { value, expires_at: now + self.ttl });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache key for a serialized page: SHA-256, hex encoded.
#[must_use]
pub fn cache_key(payload: &[u8]) -> String {
    bytes_to_hex(&Sha256::digest(payload))
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
