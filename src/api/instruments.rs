//! Instrument catalog and chain page locators

use serde::Serialize;
use url::Url;

use crate::error::{Result, ScrapeError};

/// A futures contract whose options chain can be scraped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instrument {
    pub symbol: &'static str,
    pub name: &'static str,
    pub exchange: &'static str,
    /// Identifier of the instrument on the chain page
    pub chain_symbol: &'static str,
}

const fn instrument(
    symbol: &'static str,
    name: &'static str,
    exchange: &'static str,
    chain_symbol: &'static str,
) -> Instrument {
    Instrument {
        symbol,
        name,
        exchange,
        chain_symbol,
    }
}

/// Instruments grouped by category
pub const CATALOG: &[(&str, &[Instrument])] = &[
    (
        "Energy",
        &[
            instrument("CL", "Crude Oil", "NYMEX", "NYMEX-CL1!"),
            instrument("NG", "Natural Gas", "NYMEX", "NYMEX-NG1!"),
            instrument("RB", "RBOB Gasoline", "NYMEX", "NYMEX-RB1!"),
            instrument("HO", "Heating Oil", "NYMEX", "NYMEX-HO1!"),
        ],
    ),
    (
        "Agriculture",
        &[
            instrument("ZC", "Corn", "CBOT", "CBOT-ZC1!"),
            instrument("ZW", "Wheat", "CBOT", "CBOT-ZW1!"),
            instrument("ZS", "Soybeans", "CBOT", "CBOT-ZS1!"),
            instrument("KC", "Coffee", "NYMEX", "NYMEX-KC1!"),
            instrument("CT", "Cotton", "NYMEX", "NYMEX-CT1!"),
        ],
    ),
    (
        "Metals",
        &[
            instrument("GC", "Gold", "COMEX", "COMEX-GC1!"),
            instrument("SI", "Silver", "COMEX", "COMEX-SI1!"),
            instrument("HG", "Copper", "COMEX", "COMEX-HG1!"),
            instrument("PL", "Platinum", "NYMEX", "NYMEX-PL1!"),
        ],
    ),
    (
        "Currencies",
        &[
            instrument("6E", "Euro FX", "CME", "CME-6E1!"),
            instrument("6B", "British Pound", "CME", "CME-6B1!"),
            instrument("6J", "Japanese Yen", "CME", "CME-6J1!"),
            instrument("6A", "Australian Dollar", "CME", "CME-6A1!"),
            instrument("6C", "Canadian Dollar", "CME", "CME-6C1!"),
        ],
    ),
];

/// Look up an instrument by its symbol (case-insensitive)
pub fn find_instrument(symbol: &str) -> Option<Instrument> {
    CATALOG
        .iter()
        .flat_map(|(_, instruments)| instruments.iter())
        .find(|i| i.symbol.eq_ignore_ascii_case(symbol.trim()))
        .copied()
}

/// Locator of the chain page for an instrument, optionally pinned to a strike.
///
/// `<base>/<chain_symbol>/?view=strikes[&strike=<strike>]`
pub fn chain_url(base: &str, instrument: &Instrument, strike: Option<f64>) -> Result<Url> {
    let raw = format!(
        "{}/{}/",
        base.trim_end_matches('/'),
        instrument.chain_symbol
    );
    let mut url = Url::parse(&raw)
        .map_err(|e| ScrapeError::Config(format!("Invalid chain URL {}: {}", raw, e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("view", "strikes");
        if let Some(strike) = strike {
            query.append_pair("strike", &strike.to_string());
        }
    }
    Ok(url)
}
