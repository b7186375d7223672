//! # volscrape
//!
//! Parsing of scraped options chain pages into implied volatility term
//! structures and surfaces.
//!
//! ## Features
//!
//! - Locale-aware number and expiration date parsing
//! - Chain table extraction and strike discovery from page snapshots
//! - Quote cleaning and volatility surface assembly
//! - Bilinear interpolation and display-oriented gap filling
//! - TTL cache and paced multi-strike collection over an external fetch service
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use volscrape::api::{find_instrument, ScrapeClient, SurfaceCollector};
//! use volscrape::cache::SnapshotCache;
//! use volscrape::config::Config;
//! use volscrape::models::VolSide;
//!
//! #[tokio::main]
//! async fn main() -> volscrape::error::Result<()> {
//!     let config = Config::from_env()?;
//!     config.init_logging()?;
//!
//!     let client = ScrapeClient::new(config.scrape.clone())?;
//!     let collector = SurfaceCollector::new(
//!         client,
//!         Arc::new(SnapshotCache::new(config.cache_ttl())),
//!         config.scrape.chain_base_url.clone(),
//!         config.fetch_delay(),
//!     )
//!     .with_policy(config.cleaning_policy());
//!
//!     let crude = find_instrument("CL").expect("crude oil is in the catalog");
//!     let today = chrono::Local::now().date_naive();
//!     let cancel = AtomicBool::new(false);
//!     let surface = collector
//!         .build_surface(&crude, &[65.0, 70.0, 75.0], today, &cancel)
//!         .await;
//!
//!     if let Some(vol) = surface.interpolate(72.5, 45.0, VolSide::Mid) {
//!         println!("72.5 / 45d: {:.2}%", vol);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod scrape;
pub mod utils;

// Re-export commonly used types
pub use api::{ScrapeClient, SnapshotSource, SurfaceCollector};
pub use cache::SnapshotCache;
pub use config::Config;
pub use error::{Result, ScrapeError};
pub use models::{VolSide, VolSurface};
