// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU nonce store for OAuth replay protection.
//!
//! A nonce may be used once within the timestamp window. Entries older than
//! the TTL are forgotten, as are the least recently used ones once the store
//! is full.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::error::ProviderError;

/// Default number of nonces remembered.
pub const DEFAULT_NONCE_CAPACITY: usize = 10_000;

/// In-process store of recently seen nonces.
pub struct NonceStore {
    seen: Mutex<LruCache<String, Instant>>,
    ttl: Duration,
}

impl NonceStore {
    /// Create a new store with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of nonces remembered (at least 1).
    /// - `ttl`: How long a nonce stays used.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Record `nonce` for `consumer_key`.
    ///
    /// Returns `Ok(false)` if it was already used and has not expired.
    pub fn check_and_insert(&self, consumer_key: &str, nonce: &str) -> Result<bool, ProviderError> {
        let key = format!("{consumer_key}:{nonce}");
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| ProviderError::NonceStoreUnavailable)?;

        if let Some(inserted_at) = seen.get(&key) {
            if inserted_at.elapsed() < self.ttl {
                return Ok(false);
            }
        }
        seen.put(key, Instant::now());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_CAPACITY, Duration::from_secs(300))
    }
}
