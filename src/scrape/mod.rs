//! Extraction of chain rows and strikes from scraped snapshots
//!
//! Both extractors are pure functions over the snapshot text. When the page
//! layout is not recognized they return empty collections.

pub mod strikes;
pub mod table;

pub use strikes::discover_strikes;
pub use table::extract_table;

use serde::{Deserialize, Serialize};

use crate::models::RawOptionRow;

/// Rows and strikes recovered from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedSnapshot {
    pub rows: Vec<RawOptionRow>,
    pub strikes: Vec<f64>,
}

impl ParsedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.strikes.is_empty()
    }
}

/// Run the table extractor and strike discovery over one snapshot
pub fn parse_snapshot(text: &str, markup: Option<&str>) -> ParsedSnapshot {
    ParsedSnapshot {
        rows: extract_table(text),
        strikes: discover_strikes(text, markup),
    }
}
