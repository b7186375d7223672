//! Remote access to options chain pages
//!
//! This module contains the instrument catalog, the client for the external
//! fetch service, and the collector that walks a list of strikes.

pub mod client;
pub mod collector;
pub mod instruments;

pub use client::{ScrapeClient, Snapshot, SnapshotSource};
pub use collector::{StrikeSnapshot, SurfaceCollector};
pub use instruments::{chain_url, find_instrument, Instrument, CATALOG};
