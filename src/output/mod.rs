//! Output module for the crawl dataset and run reports
//!
//! This module handles:
//! - Assembling the deduplicated dataset and writing it as CSV
//! - Summarizing a run's counts and failures

mod dataset;
pub mod stats;

pub use dataset::{Dataset, COLUMNS, UTF8_BOM};
pub use stats::{print_summary, RunSummary};
