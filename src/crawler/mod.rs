//! Crawler module for catalog page fetching and extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a fixed timeout and User-Agent
//! - Listing, breadcrumb and pagination extraction
//! - The bounded fetch pool shared by both stages
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pagination;
mod pool;

pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{extract_category, extract_listing, parse_price, ExtractError};
pub use fetcher::{build_http_client, fetch_url, FetchCause, FetchError, HttpFetcher, PageSource};
pub use pagination::resolve_total_pages;
pub use pool::{FetchPool, PoolPermit};
