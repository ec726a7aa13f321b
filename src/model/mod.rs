//! Record types produced by a crawl run
//!
//! # Components
//!
//! - `Rating` / `Category`: typed field values with their sentinel renderings
//! - `ListingFragment` / `DetailFragment` / `BookRecord`: the two extraction
//!   stages and their merge
//! - `CrawlError` / `CrawlResult`: per-run error bookkeeping and the frozen output

mod record;
mod result;

// Re-export main types
pub use record::{
    BookRecord, Category, DetailFragment, ListingFragment, Rating, CATEGORY_UNAVAILABLE,
    UNCATEGORIZED,
};
pub use result::{CrawlError, CrawlErrorKind, CrawlResult, CrawlStage, Origin};
