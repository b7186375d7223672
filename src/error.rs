use thiserror::Error;

/// Error types for the volscrape boundaries (configuration, retrieval, CLI).
///
/// The parsing and surface code never returns these; it degrades to
/// `None` or an empty collection instead.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("Fetch service error: {0}")]
    Upstream(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
