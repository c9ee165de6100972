//! Content-addressed result cache with request coalescing.
//!
//! Records are keyed by the SHA-256 of the input text. Entries expire
//! after a fixed time-to-live and the least-recently-used entry is evicted
//! once the capacity bound is exceeded.
//!
//! Concurrent requests for the same key share one computation: the first
//! caller becomes the leader and later callers wait on a watch channel
//! for its outcome. Failures are delivered to every waiter but never
//! stored, so the next request retries.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::traits::clock::{Clock, SystemClock};
use crate::types::config::PipelineConfig;
use crate::types::record::ExtractionRecord;

/// Longest accepted time-to-live (ten years).
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

type Outcome = std::result::Result<ExtractionRecord, Arc<ExtractionError>>;

/// Hex SHA-256 of a document's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A cached record snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub record: ExtractionRecord,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= self.ttl
    }
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests served by another request's in-flight computation.
    pub coalesced: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Removes the in-flight entry when the leader finishes or is cancelled.
///
/// A cancelled leader drops its sender without publishing, which wakes
/// the waiters so one of them can take over.
struct InflightGuard<'a> {
    inflight: &'a DashMap<String, watch::Receiver<Option<Outcome>>>,
    key: &'a str,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.inflight.remove(self.key);
    }
}

/// Bounded LRU + TTL store for extraction records.
pub struct ResultCache {
    entries: Mutex<IndexMap<String, CacheEntry>>,
    inflight: DashMap<String, watch::Receiver<Option<Outcome>>>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

impl ResultCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            inflight: DashMap::new(),
            capacity,
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.cache_capacity, config.cache_ttl_secs)
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &str, count_miss: bool) -> Option<ExtractionRecord> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let Some(entry) = entries.shift_remove(key) else {
            if count_miss {
                Counters::bump(&self.counters.misses);
            }
            return None;
        };

        if entry.is_expired(now) {
            debug!(key = %key, "cache entry expired");
            Counters::bump(&self.counters.expirations);
            if count_miss {
                Counters::bump(&self.counters.misses);
            }
            return None;
        }

        // re-inserting moves the entry to the most-recently-used end
        let record = entry.record.clone();
        entries.insert(key.to_string(), entry);
        Counters::bump(&self.counters.hits);
        Some(record)
    }

    /// A live record for `key`, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<ExtractionRecord> {
        self.lookup(key, true)
    }

    /// Store a record, evicting least-recently-used entries beyond capacity.
    pub fn set(&self, key: &str, record: ExtractionRecord) -> Result<()> {
        if self.capacity == 0 {
            return Err(ExtractionError::Cache("capacity is zero".to_string()));
        }

        let entry = CacheEntry {
            record,
            created_at: self.clock.now(),
            ttl: self.ttl,
        };

        let mut entries = self.lock();
        entries.shift_remove(key);
        entries.insert(key.to_string(), entry);

        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                debug!(key = %evicted, "evicted least recently used record");
                Counters::bump(&self.counters.evictions);
            }
        }
        Ok(())
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().shift_remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Return the cached record for `key`, or compute it exactly once
    /// across concurrent callers.
    ///
    /// A successful result is cached before it is published, so a request
    /// arriving after the in-flight entry is gone always finds it. A
    /// failed cache write is logged and does not fail the request.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<ExtractionRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractionRecord>>,
    {
        let tx = loop {
            if let Some(record) = self.get(key) {
                return Ok(record);
            }

            let mut rx = match self.inflight.entry(key.to_string()) {
                Entry::Occupied(occupied) => occupied.get().clone(),
                Entry::Vacant(vacant) => {
                    // the previous leader may have finished since the lookup
                    if let Some(record) = self.lookup(key, false) {
                        return Ok(record);
                    }
                    let (tx, rx) = watch::channel(None);
                    vacant.insert(rx);
                    break tx;
                }
            };

            Counters::bump(&self.counters.coalesced);
            debug!(key = %key, "waiting on in-flight extraction");

            let outcome = match rx.wait_for(Option::is_some).await {
                Ok(value) => value.clone(),
                Err(_) => None,
            };
            match outcome {
                Some(Ok(record)) => return Ok(record),
                Some(Err(err)) => return Err(ExtractionError::from_shared(err)),
                // leader cancelled; retry as a new leader or waiter
                None => continue,
            }
        };

        let guard = InflightGuard {
            inflight: &self.inflight,
            key,
        };

        let outcome = compute().await.map_err(Arc::new);
        if let Ok(record) = &outcome {
            if let Err(err) = self.set(key, record.clone()) {
                warn!(key = %key, error = %err, "failed to cache extraction record");
            }
        }

        tx.send_replace(Some(outcome.clone()));
        drop(guard);
        // release the channel's copy so an unshared failure unwraps
        drop(tx);

        outcome.map_err(ExtractionError::from_shared)
    }
}
