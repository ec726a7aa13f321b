//! Book-Harvest: a catalog crawler for paginated book listings
//!
//! This crate crawls a paginated catalog site's listing pages and per-book
//! detail pages, merges the extracted fields into fixed-shape records, and
//! writes them as a CSV dataset that the [`catalog`] module can query.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Book-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog root unreachable: {0}")]
    CatalogUnreachable(crawler::FetchError),

    #[error("Could not resolve page count: {0}")]
    Pagination(crawler::ExtractError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Book-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use model::{BookRecord, Category, CrawlError, CrawlResult, Rating};
pub use output::Dataset;
