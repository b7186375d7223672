//! Command-line scraper for one instrument's volatility surface
//!
//! `volscrape <SYMBOL> [STRIKE ...]`
//!
//! When no strikes are given, they are discovered from the instrument's base
//! chain page. The term structure of each strike goes to stderr and the filled
//! mid surface goes to stdout as JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use volscrape::api::{find_instrument, ScrapeClient, SurfaceCollector};
use volscrape::cache::SnapshotCache;
use volscrape::config::Config;
use volscrape::error::{Result, ScrapeError};
use volscrape::models::{SurfaceUpdate, VolSide, VolSurface};
use volscrape::utils::parse_num;

fn usage() -> ScrapeError {
    ScrapeError::Config("usage: volscrape <SYMBOL> [STRIKE ...]".to_string())
}

fn fmt_vol(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn print_term_structures(surface: &VolSurface) {
    for &strike in &surface.strikes {
        eprintln!("\nStrike {}", strike);
        eprintln!(
            "{:<16} {:>6} {:>8} {:>8} {:>8} {:>8}",
            "Expiration", "Days", "Call", "Put", "Mid", "Skew"
        );
        for point in surface.term_structure(strike) {
            eprintln!(
                "{:<16} {:>6} {:>8} {:>8} {:>8} {:>8}",
                point.expiration,
                point.days_to_expiry,
                fmt_vol(point.call_mid_iv),
                fmt_vol(point.put_mid_iv),
                fmt_vol(Some(point.mid_iv)),
                fmt_vol(point.skew()),
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    config.init_logging()?;

    let mut args = std::env::args().skip(1);
    let symbol = args.next().ok_or_else(usage)?;
    let instrument = find_instrument(&symbol)
        .ok_or_else(|| ScrapeError::Config(format!("Unknown instrument: {}", symbol)))?;
    let mut strikes = args
        .map(|a| parse_num(&a).ok_or_else(|| ScrapeError::Config(format!("Invalid strike: {}", a))))
        .collect::<Result<Vec<f64>>>()?;

    info!(
        "Scraping {} ({}, {})",
        instrument.name, instrument.symbol, instrument.exchange
    );

    let collector = SurfaceCollector::new(
        ScrapeClient::new(config.scrape.clone())?,
        Arc::new(SnapshotCache::new(config.cache_ttl())),
        config.scrape.chain_base_url.clone(),
        config.fetch_delay(),
    )
    .with_policy(config.cleaning_policy());

    if strikes.is_empty() {
        strikes = collector.fetch_strike(&instrument, None).await?.strikes;
        info!("Discovered {} strikes", strikes.len());
        if strikes.is_empty() {
            warn!("No strikes found on the chain page for {}", instrument.symbol);
            return Ok(());
        }
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing with the strikes collected so far");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let today = chrono::Local::now().date_naive();
    let surface = collector
        .build_surface(&instrument, &strikes, today, &cancel)
        .await;

    if surface.is_empty() {
        warn!("No usable volatility data for {}", instrument.symbol);
        return Ok(());
    }

    print_term_structures(&surface);

    let update = SurfaceUpdate::from_surface(&surface, VolSide::Mid);
    println!("{}", serde_json::to_string_pretty(&update)?);

    Ok(())
}
