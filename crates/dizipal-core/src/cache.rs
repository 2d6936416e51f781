//! Byte-bounded LRU cache for clean HTTP responses
//!
//! Keys are request identities (`METHOD URL BODY`). Only bodies that passed
//! challenge inspection are ever stored. The cache may be snapshotted to a
//! JSON file; an unreadable snapshot is discarded and the cache rebuilt.

use std::path::Path;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default capacity: 10 MiB of keys plus bodies
pub const DEFAULT_CAPACITY_BYTES: usize = 10 * 1024 * 1024;

struct CacheInner {
    entries: LruCache<String, String>,
    used_bytes: usize,
}

/// Shared response cache
///
/// Reads promote entries, so both reads and writes take the lock.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity_bytes: usize,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    /// Least recently used first
    entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    body: String,
}

fn entry_size(key: &str, body: &str) -> usize {
    key.len() + body.len()
}

impl ResponseCache {
    /// Creates an empty cache holding at most `capacity_bytes`
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                used_bytes: 0,
            }),
            capacity_bytes,
        }
    }

    /// Loads a snapshot written by [`ResponseCache::to_snapshot_json`]
    ///
    /// A missing, unreadable or corrupt file yields an empty cache.
    pub fn load(path: &Path, capacity_bytes: usize) -> Self {
        let cache = Self::new(capacity_bytes);

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache snapshot, starting empty");
                return cache;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache snapshot, starting empty");
                return cache;
            }
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                for entry in snapshot.entries {
                    cache.insert(entry.key, entry.body);
                }
                debug!(path = %path.display(), entries = cache.len(), "cache snapshot loaded");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache snapshot, starting empty");
            }
        }

        cache
    }

    /// Serializes the current contents, least recently used first
    pub fn to_snapshot_json(&self) -> serde_json::Result<String> {
        let inner = self.inner.lock();
        let mut entries: Vec<SnapshotEntry> = inner
            .entries
            .iter()
            .map(|(key, body)| SnapshotEntry {
                key: key.clone(),
                body: body.clone(),
            })
            .collect();
        entries.reverse();
        drop(inner);

        serde_json::to_string(&Snapshot { entries })
    }

    /// Returns a stored body and marks it most recently used
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Stores a body, evicting least recently used entries until it fits
    ///
    /// Returns `false` if the entry alone exceeds the capacity.
    pub fn insert(&self, key: String, body: String) -> bool {
        let size = entry_size(&key, &body);
        if size > self.capacity_bytes {
            return false;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.entries.pop(&key) {
            inner.used_bytes -= entry_size(&key, &old);
        }

        while inner.used_bytes + size > self.capacity_bytes {
            match inner.entries.pop_lru() {
                Some((old_key, old_body)) => {
                    inner.used_bytes -= entry_size(&old_key, &old_body);
                }
                None => break,
            }
        }

        inner.used_bytes += size;
        inner.entries.put(key, body);
        true
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.used_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held (keys plus bodies)
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.try_lock().map(|i| (i.entries.len(), i.used_bytes));
        f.debug_struct("ResponseCache")
            .field("capacity_bytes", &self.capacity_bytes)
            .field("usage", &inner)
            .finish()
    }
}
