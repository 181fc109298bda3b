//! In-memory metadata cache with per-entry TTL and bounded size.
//!
//! Avoids repeated introspection and ranking work. Every schema-related
//! lookup in the service goes through one [`MetadataCache`].
//!
//! # Design
//!
//! - Key-value store with JSON values (any `Serialize` type goes in, any
//!   `DeserializeOwned` type comes out)
//! - Per-entry TTL; expired entries are dropped lazily on read and by a
//!   sweep that runs at most once per cleanup interval
//! - Bounded size; at capacity the least recently accessed 20% (minimum one)
//!   are evicted before a new key is admitted
//! - One mutex over the whole map
//!
//! # Key Format
//!
//! Keys are the lowercase hex SHA256 of `{prefix}:{arg1}:{arg2}...`:
//!
//! ```text
//! schema:   {database}                            -> DatabaseSchema
//! hash:     {database}                            -> published hash and snapshot id
//! table:    {database}:{snapshot}:{table}         -> TableInfo
//! rel:      {database}:{snapshot}                 -> [ForeignKeyRelation, ...]
//! stats:    {database}:{snapshot}:{table}         -> TableStatistics
//! path:     {database}:{snapshot}:{start}:{end}   -> Option<JoinPath>
//! analysis: {database}:{snapshot}                 -> RelationshipAnalysis
//! ```
//!
//! `{snapshot}` identifies one introspection pass. Results derived from a
//! schema are only reachable while that schema is the published one.

mod hash;
pub use hash::{compute_key, sha256_hex};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

/// Default maximum number of entries.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default minimum time between expiry sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A single cached value with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    /// Serialized JSON value.
    pub value: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub ttl: Duration,
    pub access_count: u64,
    /// Monotonic counter breaking ties between equal access timestamps.
    sequence: u64,
}

impl CacheEntry {
    fn new(key: String, value: String, ttl: Duration, now: Instant, sequence: u64) -> Self {
        Self {
            key,
            value,
            created_at: now,
            last_accessed: now,
            ttl,
            access_count: 0,
            sequence,
        }
    }

    /// Whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    fn touch(&mut self, now: Instant, sequence: u64) {
        self.last_accessed = now;
        self.access_count += 1;
        self.sequence = sequence;
    }
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    last_cleanup: Instant,
    last_cleanup_at: DateTime<Utc>,
    sequence: u64,
}

impl CacheState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Thread-safe TTL/size-bounded cache.
pub struct MetadataCache {
    state: Mutex<CacheState>,
    max_size: usize,
    cleanup_interval: Duration,
}

impl MetadataCache {
    /// Create a cache with the default limits (100 entries, 5 minute sweeps).
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_SIZE, DEFAULT_CLEANUP_INTERVAL)
    }

    /// Create a cache with explicit limits. A `max_size` of zero is treated as one.
    pub fn with_limits(max_size: usize, cleanup_interval: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                last_cleanup: Instant::now(),
                last_cleanup_at: Utc::now(),
                sequence: 0,
            }),
            max_size: max_size.max(1),
            cleanup_interval,
        }
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove expired entries if the cleanup interval has elapsed.
    fn cleanup_expired(&self, state: &mut CacheState) {
        let now = Instant::now();
        if now.saturating_duration_since(state.last_cleanup) < self.cleanup_interval {
            return;
        }

        state.entries.retain(|key, entry| {
            let keep = !entry.is_expired_at(now);
            if !keep {
                debug!(key = %key, "removed expired cache entry");
            }
            keep
        });

        state.last_cleanup = now;
        state.last_cleanup_at = Utc::now();
    }

    /// Evict the least recently accessed entries if the cache is full.
    fn evict_if_needed(&self, state: &mut CacheState) {
        if state.entries.len() < self.max_size {
            return;
        }

        let mut by_access: Vec<(Instant, u64, String)> = state
            .entries
            .values()
            .map(|e| (e.last_accessed, e.sequence, e.key.clone()))
            .collect();
        by_access.sort();

        let evict_count = (by_access.len() / 5).max(1);
        for (_, _, key) in by_access.into_iter().take(evict_count) {
            state.entries.remove(&key);
            debug!(key = %key, "evicted cache entry");
        }
    }

    /// Get a value from the cache.
    ///
    /// An expired entry is removed and reported as a miss. A hit updates
    /// the entry's last-access time and access count.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let mut state = self.lock();
        self.cleanup_expired(&mut state);

        let now = Instant::now();
        let sequence = state.next_sequence();
        let Some(entry) = state.entries.get_mut(key) else {
            return Ok(None);
        };

        if entry.is_expired_at(now) {
            state.entries.remove(key);
            debug!(key, "cache entry expired on read");
            return Ok(None);
        }

        entry.touch(now, sequence);
        Ok(Some(serde_json::from_str(&entry.value)?))
    }

    /// Set a value in the cache with the given TTL.
    ///
    /// Replaces any existing entry under the same key.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;

        let mut state = self.lock();
        self.cleanup_expired(&mut state);
        if !state.entries.contains_key(key) {
            self.evict_if_needed(&mut state);
        }

        let sequence = state.next_sequence();
        state.entries.insert(
            key.to_string(),
            CacheEntry::new(key.to_string(), json, ttl, Instant::now(), sequence),
        );
        debug!(key, ttl_secs = ttl.as_secs(), "cached entry");
        Ok(())
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.lock().entries.remove(key).is_some();
        if removed {
            debug!(key, "deleted cache entry");
        }
        removed
    }

    /// Clear all entries, or only those whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, prefix: Option<&str>) -> usize {
        let mut state = self.lock();
        match prefix {
            None => {
                let count = state.entries.len();
                state.entries.clear();
                info!(count, "cleared all cache entries");
                count
            }
            Some(prefix) => {
                let before = state.entries.len();
                state.entries.retain(|key, _| !key.starts_with(prefix));
                let count = before - state.entries.len();
                info!(prefix, count, "cleared cache entries by prefix");
                count
            }
        }
    }

    /// Check whether a key is present and unexpired.
    ///
    /// Unlike [`get`](Self::get), this does not touch access metadata.
    pub fn exists(&self, key: &str) -> bool {
        let mut state = self.lock();
        self.cleanup_expired(&mut state);
        state
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let now = Instant::now();

        let total_entries = state.entries.len();
        let expired_entries = state
            .entries
            .values()
            .filter(|e| e.is_expired_at(now))
            .count();
        let total_access_count: u64 = state.entries.values().map(|e| e.access_count).sum();
        let average_access_count = if total_entries > 0 {
            total_access_count as f64 / total_entries as f64
        } else {
            0.0
        };
        let estimated_memory_bytes = state.entries.values().map(|e| e.value.len()).sum();

        CacheStats {
            total_entries,
            active_entries: total_entries - expired_entries,
            expired_entries,
            max_size: self.max_size,
            utilization_percent: total_entries as f64 / self.max_size as f64 * 100.0,
            total_access_count,
            average_access_count,
            estimated_memory_bytes,
            last_cleanup: state.last_cleanup_at,
        }
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub max_size: usize,
    pub utilization_percent: f64,
    pub total_access_count: u64,
    pub average_access_count: f64,
    /// Rough size of all serialized values in bytes.
    pub estimated_memory_bytes: usize,
    /// When the last expiry sweep ran (cache creation if none has run yet).
    pub last_cleanup: DateTime<Utc>,
}

/// Class of cached data. Each class has its own key prefix and default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Schema,
    SchemaHash,
    Relationships,
    Tables,
    Statistics,
    JoinPaths,
    Analysis,
}

impl CacheNamespace {
    pub fn prefix(self) -> &'static str {
        match self {
            CacheNamespace::Schema => "schema:",
            CacheNamespace::SchemaHash => "hash:",
            CacheNamespace::Relationships => "rel:",
            CacheNamespace::Tables => "table:",
            CacheNamespace::Statistics => "stats:",
            CacheNamespace::JoinPaths => "path:",
            CacheNamespace::Analysis => "analysis:",
        }
    }

    pub fn default_ttl(self) -> Duration {
        let minutes = match self {
            CacheNamespace::Schema => 30,
            CacheNamespace::SchemaHash => 30,
            CacheNamespace::Relationships => 30,
            CacheNamespace::Tables => 60,
            CacheNamespace::Statistics => 120,
            CacheNamespace::JoinPaths => 60,
            CacheNamespace::Analysis => 30,
        };
        Duration::from_secs(minutes * 60)
    }
}

/// Helper for generating cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Hash a namespace and its arguments into a key.
    pub fn generate<S: AsRef<str>>(namespace: CacheNamespace, args: &[S]) -> String {
        compute_key(namespace.prefix(), args)
    }

    /// Key for a database's schema.
    pub fn schema(database: &str) -> String {
        Self::generate(CacheNamespace::Schema, &[database])
    }

    /// Key for a database's published schema hash.
    pub fn schema_hash(database: &str) -> String {
        Self::generate(CacheNamespace::SchemaHash, &[database])
    }

    /// Key for a single table of one schema snapshot.
    pub fn table(database: &str, snapshot: &str, table: &str) -> String {
        Self::generate(CacheNamespace::Tables, &[database, snapshot, table])
    }

    /// Key for the flattened relationship list of one schema snapshot.
    pub fn relationships(database: &str, snapshot: &str) -> String {
        Self::generate(CacheNamespace::Relationships, &[database, snapshot])
    }

    /// Key for a table's statistics.
    pub fn statistics(database: &str, snapshot: &str, table: &str) -> String {
        Self::generate(CacheNamespace::Statistics, &[database, snapshot, table])
    }

    /// Key for the join path between two tables.
    pub fn join_path(database: &str, snapshot: &str, start: &str, end: &str) -> String {
        Self::generate(CacheNamespace::JoinPaths, &[database, snapshot, start, end])
    }

    /// Key for the relationship analysis.
    pub fn analysis(database: &str, snapshot: &str) -> String {
        Self::generate(CacheNamespace::Analysis, &[database, snapshot])
    }
}
