//! # Time-windowed cache
//! Payload + creation timestamp, stored as JSON in a [`KeyValueStore`].
//!
//! Replace-or-miss only: an envelope is either read whole or treated as absent.
//! Expired envelopes are not purged, the next successful write overwrites them.

use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEnvelope<T> {
    pub payload: T,
    /// Unix milliseconds at write time.
    pub timestamp_ms: i64,
}

impl<T> CacheEnvelope<T> {
    /// Valid iff `now - timestamp <= ttl`. No TTL means valid until the store is cleared.
    pub fn is_fresh(&self, now_ms: i64, ttl: Option<Duration>) -> bool {
        match ttl {
            None => true,
            Some(ttl) => now_ms.saturating_sub(self.timestamp_ms) <= ttl.num_milliseconds(),
        }
    }
}

#[derive(Clone)]
pub struct TimedCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
    ttl: Option<Duration>,
}

impl TimedCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            clock,
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Cache whose entries live as long as the backing store does.
    pub fn session(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::new(store, clock, namespace, None)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Unix milliseconds on the cache's clock; the same value a write would stamp.
    pub fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = self.full_key(key);
        let raw = self.store.get(&full)?;
        let env: CacheEnvelope<T> = match serde_json::from_str(&raw) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, key = %full, "corrupt cache entry, resetting");
                self.store.remove(&full);
                return None;
            }
        };
        let now_ms = self.now_ms();
        if env.is_fresh(now_ms, self.ttl) {
            Some(env.payload)
        } else {
            None
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let env = CacheEnvelope {
            payload: value,
            timestamp_ms: self.now_ms(),
        };
        match serde_json::to_string(&env) {
            Ok(json) => self.store.set(&self.full_key(key), &json),
            Err(e) => tracing::warn!(error = %e, namespace = %self.namespace, "cache encode failed"),
        }
    }

    pub fn clear(&self, key: &str) {
        self.store.remove(&self.full_key(key));
    }
}
