//! Sequential multi-strike collection
//!
//! For each strike: check the cache, otherwise wait for the fetch pacing
//! window, fetch, parse, and cache. Failed strikes are skipped; cancelling
//! keeps whatever was already collected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use ordered_float::OrderedFloat;
use tracing::{debug, info, warn};

use crate::api::client::SnapshotSource;
use crate::api::instruments::{chain_url, Instrument};
use crate::cache::SnapshotCache;
use crate::error::Result;
use crate::models::{build_vol_surface_with, CleaningPolicy, RawOptionRow, StrikeRows, VolSurface};
use crate::scrape::parse_snapshot;

/// Rows and strikes for one (instrument, strike) request
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeSnapshot {
    pub rows: Vec<RawOptionRow>,
    pub strikes: Vec<f64>,
    pub from_cache: bool,
}

pub struct SurfaceCollector<S> {
    source: S,
    cache: Arc<SnapshotCache>,
    limiter: Option<DefaultDirectRateLimiter>,
    chain_base_url: String,
    policy: CleaningPolicy,
}

impl<S: SnapshotSource> SurfaceCollector<S> {
    /// `fetch_delay` is the minimum spacing between two remote fetches; zero
    /// disables pacing.
    pub fn new(
        source: S,
        cache: Arc<SnapshotCache>,
        chain_base_url: impl Into<String>,
        fetch_delay: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            limiter: Quota::with_period(fetch_delay).map(RateLimiter::direct),
            chain_base_url: chain_base_url.into(),
            policy: CleaningPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CleaningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Rows and strikes for one request, from the cache when possible
    pub async fn fetch_strike(
        &self,
        instrument: &Instrument,
        strike: Option<f64>,
    ) -> Result<StrikeSnapshot> {
        if let Some(entry) = self.cache.get(instrument.symbol, strike) {
            debug!("Cache hit for {} / {:?}", instrument.symbol, strike);
            return Ok(StrikeSnapshot {
                rows: entry.rows.clone(),
                strikes: entry.strikes.clone(),
                from_cache: true,
            });
        }

        let locator = chain_url(&self.chain_base_url, instrument, strike)?;
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        let snapshot = self.source.fetch(&locator).await?;
        let parsed = parse_snapshot(&snapshot.markdown, snapshot.html.as_deref());

        if parsed.rows.is_empty() {
            warn!(
                "No chain rows found for {} / {:?}",
                instrument.symbol, strike
            );
        } else {
            self.cache.set(
                instrument.symbol,
                strike,
                parsed.rows.clone(),
                parsed.strikes.clone(),
            );
        }

        Ok(StrikeSnapshot {
            rows: parsed.rows,
            strikes: parsed.strikes,
            from_cache: false,
        })
    }

    /// Collect rows for each strike in order until done or cancelled
    pub async fn collect(
        &self,
        instrument: &Instrument,
        strikes: &[f64],
        cancel: &AtomicBool,
    ) -> StrikeRows {
        let mut collected = StrikeRows::new();

        for (i, &strike) in strikes.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    "Collection for {} cancelled after {} of {} strikes",
                    instrument.symbol,
                    i,
                    strikes.len()
                );
                break;
            }

            match self.fetch_strike(instrument, Some(strike)).await {
                Ok(snapshot) if !snapshot.rows.is_empty() => {
                    collected.insert(OrderedFloat(strike), snapshot.rows);
                }
                Ok(_) => debug!("Strike {} returned no rows", strike),
                Err(e) => warn!("Failed to fetch strike {} for {}: {}", strike, instrument.symbol, e),
            }
        }

        info!(
            "Collected {} of {} strikes for {}",
            collected.len(),
            strikes.len(),
            instrument.symbol
        );
        collected
    }

    /// Collect the strikes and build a surface from whatever was gathered
    pub async fn build_surface(
        &self,
        instrument: &Instrument,
        strikes: &[f64],
        today: NaiveDate,
        cancel: &AtomicBool,
    ) -> VolSurface {
        let collected = self.collect(instrument, strikes, cancel).await;
        build_vol_surface_with(&collected, today, &self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::Snapshot;
    use crate::api::instruments::find_instrument;
    use crate::error::ScrapeError;
    use std::sync::atomic::AtomicUsize;
    use url::Url;

    const BASE: &str = "https://chain.example.com/options";

    fn chain_text(label: &str, bid: &str, ask: &str) -> String {
        let mut cells = vec![bid, ask];
        cells.extend(std::iter::repeat("\u{2014}").take(11));
        cells.push(label);
        cells.extend(std::iter::repeat("\u{2014}").take(13));
        format!(
            "Strikes 70,00 75,00\n| Calls | Puts |\n| h |\n| --- |\n| {} |\n",
            cells.join(" | ")
        )
    }

    /// Serves strike 70 and 75, fails on anything else
    struct FakeSource {
        calls: AtomicUsize,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                cancel_after: None,
            }
        }
    }

    impl SnapshotSource for FakeSource {
        async fn fetch(&self, locator: &Url) -> Result<Snapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, flag)) = &self.cancel_after {
                if n >= *limit {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            let strike = locator
                .query_pairs()
                .find(|(k, _)| k == "strike")
                .map(|(_, v)| v.into_owned());
            match strike.as_deref() {
                Some("70") => Ok(Snapshot {
                    markdown: chain_text("12 févr. 2026", "20,0", "22,0"),
                    html: None,
                }),
                Some("75") => Ok(Snapshot {
                    markdown: chain_text("12 févr. 2026", "24,0", "26,0"),
                    html: None,
                }),
                None => Ok(Snapshot {
                    markdown: "Strikes 70,00 75,00\n".to_string(),
                    html: None,
                }),
                Some(other) => Err(ScrapeError::Upstream(format!("no page for {}", other))),
            }
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let collector = SurfaceCollector::new(
            FakeSource::new(),
            Arc::new(SnapshotCache::default()),
            BASE,
            Duration::ZERO,
        );
        let cl = find_instrument("CL").unwrap();

        let first = collector.fetch_strike(&cl, Some(70.0)).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.rows.len(), 1);
        assert_eq!(first.strikes, vec![70.0, 75.0]);

        let second = collector.fetch_strike(&cl, Some(70.0)).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.rows, first.rows);
        assert_eq!(collector.source.calls.load(Ordering::SeqCst), 1);

        // strike listing page has no rows and is not cached
        let base = collector.fetch_strike(&cl, None).await.unwrap();
        assert!(base.rows.is_empty());
        assert_eq!(base.strikes, vec![70.0, 75.0]);
        assert!(collector.cache().get("CL", None).is_none());
    }

    #[tokio::test]
    async fn failed_strikes_are_skipped() {
        let collector = SurfaceCollector::new(
            FakeSource::new(),
            Arc::new(SnapshotCache::default()),
            BASE,
            Duration::ZERO,
        );
        let cl = find_instrument("CL").unwrap();
        let cancel = AtomicBool::new(false);

        let surface = collector
            .build_surface(&cl, &[70.0, 72.5, 75.0], today(), &cancel)
            .await;
        assert_eq!(surface.strikes, vec![70.0, 75.0]);
        assert_eq!(surface.maturities, vec![42]);
        assert_eq!(surface.grid_mid[[0, 0]], Some(21.0));
        assert_eq!(surface.grid_mid[[1, 0]], Some(25.0));
        assert_eq!(collector.cache().get_all_for_ticker("CL").len(), 2);
    }

    #[tokio::test]
    async fn cancellation_keeps_partial_results() {
        let cancel = Arc::new(AtomicBool::new(false));
        let source = FakeSource {
            calls: AtomicUsize::new(0),
            cancel_after: Some((1, Arc::clone(&cancel))),
        };
        let collector = SurfaceCollector::new(
            source,
            Arc::new(SnapshotCache::default()),
            BASE,
            Duration::ZERO,
        );
        let cl = find_instrument("CL").unwrap();

        let rows = collector.collect(&cl, &[70.0, 75.0], &cancel).await;
        assert_eq!(rows.len(), 1);
        assert!(rows.contains_key(&OrderedFloat(70.0)));
        assert_eq!(collector.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remote_fetches_are_spaced() {
        let collector = SurfaceCollector::new(
            FakeSource::new(),
            Arc::new(SnapshotCache::default()),
            BASE,
            Duration::from_millis(50),
        );
        let cl = find_instrument("CL").unwrap();
        let cancel = AtomicBool::new(false);

        let started = std::time::Instant::now();
        collector.collect(&cl, &[70.0, 75.0, 72.5], &cancel).await;
        assert!(started.elapsed() >= Duration::from_millis(90));

        // everything that succeeded is cached, so a rerun does not wait
        let started = std::time::Instant::now();
        collector.collect(&cl, &[70.0, 75.0], &cancel).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
