//! Short-lived in-memory cache of scraped chain rows
//!
//! Entries are keyed by ticker and optional strike and expire a fixed window
//! after insertion. Expired entries are dropped when read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use crate::models::{RawOptionRow, StrikeRows};

/// Default expiry window
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    ticker: String,
    strike: Option<OrderedFloat<f64>>,
}

impl CacheKey {
    fn new(ticker: &str, strike: Option<f64>) -> Self {
        Self {
            ticker: ticker.to_string(),
            strike: strike.map(OrderedFloat),
        }
    }
}

/// Rows and discovered strikes stored for one (ticker, strike) request
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub rows: Vec<RawOptionRow>,
    pub strikes: Vec<f64>,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

pub struct SnapshotCache {
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    ttl: Duration,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unexpired entry for the key, evicting it if it has expired
    pub fn get(&self, ticker: &str, strike: Option<f64>) -> Option<Arc<CacheEntry>> {
        let key = CacheKey::new(ticker, strike);
        let entry = self.entries.get(&key).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired(self.ttl) {
            trace!("Cache entry for {} / {:?} expired", ticker, strike);
            self.entries
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &entry));
            return None;
        }
        Some(entry)
    }

    pub fn set(&self, ticker: &str, strike: Option<f64>, rows: Vec<RawOptionRow>, strikes: Vec<f64>) {
        debug!(
            "Caching {} rows for {} / {:?}",
            rows.len(),
            ticker,
            strike
        );
        self.entries.insert(
            CacheKey::new(ticker, strike),
            Arc::new(CacheEntry {
                rows,
                strikes,
                inserted_at: Instant::now(),
            }),
        );
    }

    /// Every unexpired, non-empty per-strike entry for the ticker
    pub fn get_all_for_ticker(&self, ticker: &str) -> StrikeRows {
        self.entries
            .iter()
            .filter(|e| e.key().ticker == ticker && !e.value().is_expired(self.ttl))
            .filter(|e| !e.value().rows.is_empty())
            .filter_map(|e| e.key().strike.map(|s| (s, e.value().rows.clone())))
            .collect()
    }

    /// Number of per-strike entries held for the ticker, expired or not
    pub fn cached_strike_count(&self, ticker: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key().ticker == ticker && e.key().strike.is_some())
            .count()
    }

    /// Drop the entries of one ticker, or everything
    pub fn clear(&self, ticker: Option<&str>) {
        match ticker {
            Some(t) => self.entries.retain(|key, _| key.ticker != t),
            None => self.entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(label: &str) -> Vec<RawOptionRow> {
        vec![RawOptionRow {
            expiration: label.to_string(),
            ..RawOptionRow::default()
        }]
    }

    #[test]
    fn set_and_get() {
        let cache = SnapshotCache::default();
        assert!(cache.get("CL", Some(70.0)).is_none());

        cache.set("CL", Some(70.0), rows("a"), vec![65.0, 70.0]);
        cache.set("CL", None, Vec::new(), vec![65.0, 70.0, 75.0]);

        let entry = cache.get("CL", Some(70.0)).unwrap();
        assert_eq!(entry.rows[0].expiration, "a");
        assert_eq!(entry.strikes, vec![65.0, 70.0]);
        assert_eq!(cache.get("CL", None).unwrap().strikes.len(), 3);
        assert!(cache.get("CL", Some(75.0)).is_none());
        assert!(cache.get("NG", Some(70.0)).is_none());
    }

    #[test]
    fn all_for_ticker_skips_empty_and_other_tickers() {
        let cache = SnapshotCache::default();
        cache.set("CL", Some(75.0), rows("b"), Vec::new());
        cache.set("CL", Some(70.0), rows("a"), Vec::new());
        cache.set("CL", Some(80.0), Vec::new(), Vec::new());
        cache.set("CL", None, rows("base"), Vec::new());
        cache.set("CLX", Some(70.0), rows("other"), Vec::new());

        let all = cache.get_all_for_ticker("CL");
        let strikes: Vec<f64> = all.keys().map(|k| k.0).collect();
        assert_eq!(strikes, vec![70.0, 75.0]);
        assert_eq!(cache.cached_strike_count("CL"), 3);

        cache.clear(Some("CL"));
        assert_eq!(cache.cached_strike_count("CL"), 0);
        assert_eq!(cache.len(), 1);
        cache.clear(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn entries_expire() {
        let cache = SnapshotCache::new(Duration::from_millis(20));
        cache.set("CL", Some(70.0), rows("a"), Vec::new());
        assert!(cache.get("CL", Some(70.0)).is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get_all_for_ticker("CL").is_empty());
        assert!(cache.get("CL", Some(70.0)).is_none());
        assert!(cache.is_empty());
    }
}
