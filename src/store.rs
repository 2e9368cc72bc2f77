use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where uploaded datasets live between requests.
pub trait DatasetStore {
    /// The dataset stored under `id`, unless it is missing or expired.
    fn get(&self, id: &SessionId, now: DateTime<Utc>) -> Option<Arc<Dataset>>;

    fn put(&mut self, id: SessionId, dataset: Arc<Dataset>, now: DateTime<Utc>);

    /// Forgets one session, returning its dataset if it was still stored.
    fn remove(&mut self, id: &SessionId) -> Option<Arc<Dataset>>;

    /// Drops every entry older than the retention window; returns how many.
    fn evict(&mut self, now: DateTime<Utc>) -> usize;
}

struct StoredDataset {
    dataset: Arc<Dataset>,
    stored_at: DateTime<Utc>,
}

/// In-process store with a fixed time-to-live.
pub struct MemoryStore {
    ttl: Duration,
    entries: HashMap<SessionId, StoredDataset>,
}

impl MemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &StoredDataset, now: DateTime<Utc>) -> bool {
        now - entry.stored_at > self.ttl
    }
}

impl DatasetStore for MemoryStore {
    fn get(&self, id: &SessionId, now: DateTime<Utc>) -> Option<Arc<Dataset>> {
        self.entries
            .get(id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| Arc::clone(&entry.dataset))
    }

    fn put(&mut self, id: SessionId, dataset: Arc<Dataset>, now: DateTime<Utc>) {
        self.entries.insert(
            id,
            StoredDataset {
                dataset,
                stored_at: now,
            },
        );
    }

    fn remove(&mut self, id: &SessionId) -> Option<Arc<Dataset>> {
        self.entries.remove(id).map(|entry| entry.dataset)
    }

    fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.stored_at <= ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "evicted expired sessions");
        }
        evicted
    }
}
