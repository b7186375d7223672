use serde::{Deserialize, Serialize};

use crate::utils::parse_num;

/// Number of per-side fields in a chain row
pub const SIDE_FIELD_COUNT: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// One side (call or put) of a scraped chain row.
///
/// Every field is independently optional; `None` means the cell was blank,
/// a dash placeholder, or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideFields {
    pub bid_iv: Option<f64>,
    pub ask_iv: Option<f64>,
    pub intrinsic: Option<f64>,
    pub time_value: Option<f64>,
    pub rho: Option<f64>,
    pub vega: Option<f64>,
    pub theta: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    pub price: Option<f64>,
    pub ask: Option<f64>,
    pub bid: Option<f64>,
    pub volume: Option<f64>,
}

impl SideFields {
    /// Parse the 13 side cells given in call-side column order: bid IV, ask IV,
    /// intrinsic, time value, rho, vega, theta, gamma, delta, price, ask, bid,
    /// volume. Put cells are mirrored, so callers reverse them first.
    pub fn from_cells(cells: [&str; SIDE_FIELD_COUNT]) -> Self {
        let [bid_iv, ask_iv, intrinsic, time_value, rho, vega, theta, gamma, delta, price, ask, bid, volume] =
            cells.map(parse_num);
        Self {
            bid_iv,
            ask_iv,
            intrinsic,
            time_value,
            rho,
            vega,
            theta,
            gamma,
            delta,
            price,
            ask,
            bid,
            volume,
        }
    }
}

/// One maturity of a scraped chain for a single strike
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOptionRow {
    /// Expiration label as shown on the page
    pub expiration: String,
    pub call: SideFields,
    pub put: SideFields,
}

impl RawOptionRow {
    pub fn side(&self, option_type: OptionType) -> &SideFields {
        match option_type {
            OptionType::Call => &self.call,
            OptionType::Put => &self.put,
        }
    }
}
