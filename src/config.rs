use crate::error::{Result, ScrapeError};
use crate::models::CleaningPolicy;
use dotenv::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for the external fetch service
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// URL the fetch requests are posted to
    pub endpoint: String,
    /// Optional bearer token for the fetch service
    pub api_key: Option<String>,
    /// Base URL of the options-chain page handed to the fetch service
    pub chain_base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Fetch service configuration
    pub scrape: ScrapeConfig,
    /// Snapshot cache expiry window in seconds
    pub cache_ttl_secs: u64,
    /// Minimum spacing between two remote fetches in milliseconds
    pub fetch_delay_ms: u64,
    /// Tolerance band for the bid > ask quote check
    pub quote_tolerance: f64,
    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let endpoint = env::var("SCRAPE_ENDPOINT").map_err(|_| {
            ScrapeError::Config("SCRAPE_ENDPOINT environment variable not set".to_string())
        })?;
        let api_key = env::var("SCRAPE_API_KEY").ok().filter(|k| !k.is_empty());
        let chain_base_url = env::var("CHAIN_BASE_URL")
            .unwrap_or_else(|_| "https://fr.tradingview.com/options/chain".to_string());

        let timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", 60)?;
        let cache_ttl_secs = parse_var("CACHE_TTL_SECS", 30 * 60)?;
        let fetch_delay_ms = parse_var("FETCH_DELAY_MS", 1500)?;
        let quote_tolerance: f64 = parse_var("QUOTE_TOLERANCE", 0.10)?;
        if !quote_tolerance.is_finite() || quote_tolerance < 0.0 {
            return Err(ScrapeError::Config(format!(
                "QUOTE_TOLERANCE must be a non-negative number, got {}",
                quote_tolerance
            )));
        }
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            scrape: ScrapeConfig {
                endpoint,
                api_key,
                chain_base_url,
                timeout_secs,
            },
            cache_ttl_secs,
            fetch_delay_ms,
            quote_tolerance,
            log_level,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    /// Cleaning policy with the configured quote tolerance
    pub fn cleaning_policy(&self) -> CleaningPolicy {
        CleaningPolicy {
            quote_tolerance: self.quote_tolerance,
            ..CleaningPolicy::default()
        }
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();

        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ScrapeError::Config(format!("{} has an invalid value: {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
