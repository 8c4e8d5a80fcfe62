use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

use super::key::QueryKey;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: JsonValue,
    pub updated_at: Instant,
    pub invalidated: bool,
}

impl CacheEntry {
    pub fn new(data: JsonValue) -> Self {
        Self {
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.updated_at)
    }

    /// Stale entries are served only after a refetch.
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated || self.age() >= stale_time
    }
}

/// Storage behind [`QueryClient`](super::query_client::QueryClient).
///
/// Shared process-wide; implementations must be safe to call from any task.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &QueryKey) -> Option<CacheEntry>;

    fn put(&self, key: QueryKey, data: JsonValue);

    /// Stores `data` already marked invalidated.
    fn put_stale(&self, key: QueryKey, data: JsonValue);

    /// Marks every entry under `prefix` stale. Returns how many were hit.
    fn invalidate(&self, prefix: &QueryKey) -> usize;

    fn remove(&self, prefix: &QueryKey) -> usize;

    fn keys(&self) -> Vec<QueryKey>;

    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn put(&self, key: QueryKey, data: JsonValue) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key, CacheEntry::new(data));
    }

    fn put_stale(&self, key: QueryKey, data: JsonValue) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut entry = CacheEntry::new(data);
        entry.invalidated = true;
        guard.insert(key, entry);
    }

    fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut hit = 0;
        for (key, entry) in guard.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                hit += 1;
            }
        }
        hit
    }

    fn remove(&self, prefix: &QueryKey) -> usize {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        before - guard.len()
    }

    fn keys(&self) -> Vec<QueryKey> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<QueryKey> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn clear(&self) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }
}
