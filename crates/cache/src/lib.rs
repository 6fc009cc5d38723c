//! Versioned, TTL-differentiated in-process cache for LLM and retrieval
//! responses.
//!
//! Keys are a SHA-256 digest of `(operation_type, version, args...)`, so key
//! size stays constant regardless of prompt length. The operation type is
//! also stored unhashed alongside each entry: hashed keys keep no inspectable
//! prefix, and prefix clearing must match on real metadata.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Short TTL for cheap, volatile extraction-style operations.
pub const LLM_TTL: Duration = Duration::from_secs(3600);
/// Long TTL for expensive composition calls unlikely to change.
pub const COMPOSITION_TTL: Duration = Duration::from_secs(21600);
/// Middle ground for retrieval/embedding operations.
pub const EMBEDDING_TTL: Duration = Duration::from_secs(7200);

/// TTL policy differentiated by operation type. Operations differ in cost
/// and volatility; a uniform TTL would either recompute expensive results
/// or serve stale cheap ones.
pub fn ttl_for(op_type: &str) -> Duration {
    match op_type {
        "composition" => COMPOSITION_TTL,
        "embedding" | "evidence" => EMBEDDING_TTL,
        _ => LLM_TTL,
    }
}

/// Time source, injectable so expiry is testable with a simulated clock.
pub trait Clock: Send + Sync + 'static {
    /// Seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Hand-advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.secs
            .fetch_add(by.as_secs(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.secs.load(std::sync::atomic::Ordering::SeqCst)
    }
}

struct CacheEntry {
    /// Unhashed operation type, kept for reliable prefix eviction.
    op_type: String,
    value: Value,
    created_at: u64,
}

#[derive(Debug, Default, Clone)]
struct TypeStats {
    hits: u64,
    misses: u64,
}

/// Per-operation-type hit/miss breakdown.
#[derive(Debug, Serialize)]
pub struct TypeStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
}

/// Aggregate cache statistics.
#[derive(Debug, Serialize)]
pub struct CacheStatsSnapshot {
    pub total_entries: usize,
    pub total_requests: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub overall_hit_rate_percent: f64,
    pub breakdown_by_type: std::collections::HashMap<String, TypeStatsSnapshot>,
}

/// In-process response cache. Constructed explicitly and passed to callers;
/// owns its own synchronization (DashMap shards) and lifecycle.
pub struct ResponseCache<C: Clock = SystemClock> {
    entries: DashMap<String, CacheEntry>,
    stats: DashMap<String, TypeStats>,
    clock: C,
}

impl ResponseCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ResponseCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ResponseCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            stats: DashMap::new(),
            clock,
        }
    }

    /// Look up a cached value under the per-type TTL policy.
    pub fn get(&self, op_type: &str, version: &str, args: &[&str]) -> Option<Value> {
        self.get_with_ttl(op_type, version, args, ttl_for(op_type))
    }

    /// Look up with an explicit TTL. Expired entries are evicted lazily
    /// here, never proactively, and never count as a hit.
    pub fn get_with_ttl(
        &self,
        op_type: &str,
        version: &str,
        args: &[&str],
        ttl: Duration,
    ) -> Option<Value> {
        let key = make_key(op_type, version, args);

        let expired = match self.entries.get(&key) {
            None => {
                self.record(op_type, false);
                return None;
            }
            Some(entry) => {
                let age = self.clock.now().saturating_sub(entry.created_at);
                if age <= ttl.as_secs() {
                    self.record(op_type, true);
                    return Some(entry.value.clone());
                }
                true
            }
        };

        if expired {
            self.entries.remove(&key);
            debug!(op_type, "evicted expired cache entry");
        }
        self.record(op_type, false);
        None
    }

    pub fn set(&self, op_type: &str, version: &str, args: &[&str], value: Value) {
        let key = make_key(op_type, version, args);
        self.entries.insert(
            key,
            CacheEntry {
                op_type: op_type.to_string(),
                value,
                created_at: self.clock.now(),
            },
        );
    }

    /// Clear cached entries. With a prefix, only entries whose operation
    /// type starts with it are removed; a full clear also resets the
    /// hit/miss counters.
    pub fn clear(&self, prefix: Option<&str>) {
        match prefix {
            None => {
                self.entries.clear();
                self.stats.clear();
            }
            Some(p) => {
                self.entries.retain(|_, entry| !entry.op_type.starts_with(p));
            }
        }
    }

    /// Drop all composition entries. Called when a node's text is edited:
    /// any composed prose that may have included it is stale.
    pub fn invalidate_composition(&self) {
        let before = self.entries.len();
        self.clear(Some("composition"));
        // Concurrent inserts can land between clear and len.
        debug!(
            removed = before.saturating_sub(self.entries.len()),
            "invalidated composition cache"
        );
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let mut breakdown = std::collections::HashMap::new();
        let mut total_hits = 0;
        let mut total_misses = 0;

        for entry in self.stats.iter() {
            let TypeStats { hits, misses } = *entry.value();
            total_hits += hits;
            total_misses += misses;
            breakdown.insert(
                entry.key().clone(),
                TypeStatsSnapshot {
                    hits,
                    misses,
                    total_requests: hits + misses,
                    hit_rate_percent: rate(hits, hits + misses),
                },
            );
        }

        let total_requests = total_hits + total_misses;
        CacheStatsSnapshot {
            total_entries: self.entries.len(),
            total_requests,
            total_hits,
            total_misses,
            overall_hit_rate_percent: rate(total_hits, total_requests),
            breakdown_by_type: breakdown,
        }
    }

    fn record(&self, op_type: &str, hit: bool) {
        let mut stats = self.stats.entry(op_type.to_string()).or_default();
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
    }
}

/// Hit rate as a percentage; zero when there were no requests.
fn rate(hits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

/// Digest of `(op_type, version, args...)`. Fields are joined with a unit
/// separator so adjacent arguments cannot collide by concatenation.
fn make_key(op_type: &str, version: &str, args: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(op_type.as_bytes());
    hasher.update([0x1f]);
    hasher.update(version.as_bytes());
    for arg in args {
        hasher.update([0x1f]);
        hasher.update(arg.as_bytes());
    }
    hex::encode(hasher.finalize())
}
