//! Configuration module for Book-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; omitted values fall back to the defaults
//! for `books.toscrape.com`.
//!
//! # Example
//!
//! ```no_run
//! use book_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Pool size: {}", config.crawler.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
