// src/ledger.rs
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{local_date_string, Clock};
use crate::model::{EpisodeKey, UserId};
use crate::store::KeyValueStore;

/// Day-scoped set of episode events already notified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Local `YYYY-MM-DD` this snapshot belongs to.
    pub date: String,
    pub notified: Vec<EpisodeKey>,
}

impl LedgerSnapshot {
    fn fresh(date: String) -> Self {
        Self {
            date,
            notified: Vec::new(),
        }
    }

    pub fn contains(&self, key: &EpisodeKey) -> bool {
        self.notified.contains(key)
    }
}

/// Dedup ledger for one user.
/// - Every access runs the date guard first.
/// - A stored snapshot from another day (or one that fails to parse) is replaced by an
///   empty snapshot for today, never edited in place.
/// - Only [`DedupLedger::record`] adds entries; callers invoke it after a confirmed send.
#[derive(Clone)]
pub struct DedupLedger {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
}

impl DedupLedger {
    pub const NAMESPACE: &'static str = "notified_episodes";

    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, user: &UserId) -> Self {
        Self {
            store,
            clock,
            key: format!("{}:{}", Self::NAMESPACE, user),
        }
    }

    pub fn load(&self) -> LedgerSnapshot {
        let today = local_date_string(self.clock.as_ref());
        let stored = self
            .store
            .get(&self.key)
            .and_then(|raw| match serde_json::from_str::<LedgerSnapshot>(&raw) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt notification ledger, resetting");
                    None
                }
            });

        match stored {
            Some(s) if s.date == today => s,
            _ => {
                let fresh = LedgerSnapshot::fresh(today);
                self.persist(&fresh);
                fresh
            }
        }
    }

    pub fn contains(&self, key: &EpisodeKey) -> bool {
        self.load().contains(key)
    }

    pub fn record(&self, key: EpisodeKey) {
        let mut snap = self.load();
        if !snap.contains(&key) {
            snap.notified.push(key);
            self.persist(&snap);
        }
    }

    pub fn clear(&self) {
        self.store.remove(&self.key);
    }

    fn persist(&self, snap: &LedgerSnapshot) {
        match serde_json::to_string(snap) {
            Ok(json) => self.store.set(&self.key, &json),
            Err(e) => tracing::warn!(error = %e, "ledger encode failed"),
        }
    }
}
