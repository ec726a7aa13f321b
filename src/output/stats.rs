//! Run summary generation
//!
//! This module condenses a finished crawl and its dataset into the counts and
//! affected pages/identifiers reported at the end of a run.

use crate::model::{CrawlErrorKind, CrawlResult, CrawlStage};
use crate::output::Dataset;
use std::collections::BTreeMap;

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Listing pages the catalog reported
    pub total_pages: u32,

    /// Listing pages that failed as a whole
    pub failed_pages: Vec<u32>,

    /// Records produced by the crawl, before assembly
    pub records_crawled: usize,

    /// Rows in the assembled dataset
    pub rows_written: usize,

    pub duplicates_dropped: usize,
    pub missing_id_dropped: usize,

    /// Records whose category fell back to the unavailable sentinel
    pub categories_unavailable: usize,

    /// Error counts by kind
    pub errors_by_kind: BTreeMap<CrawlErrorKind, usize>,

    /// Identifiers of books with a recorded error, in discovery order
    pub affected_ids: Vec<String>,

    /// Wall-clock duration of the crawl in seconds
    pub duration_seconds: f64,
}

impl RunSummary {
    /// Builds the summary of a crawl and the dataset assembled from it
    pub fn new(result: &CrawlResult, dataset: &Dataset) -> Self {
        let mut errors_by_kind = BTreeMap::new();
        for error in result.errors() {
            *errors_by_kind.entry(error.kind).or_insert(0) += 1;
        }

        let mut affected_ids: Vec<String> = Vec::new();
        for id in result.errors().iter().filter_map(|e| e.book_id.as_ref()) {
            if !affected_ids.contains(id) {
                affected_ids.push(id.clone());
            }
        }

        let categories_unavailable = result
            .errors()
            .iter()
            .filter(|e| e.stage == CrawlStage::Detail)
            .count();

        let duration = result.finished_at() - result.started_at();

        Self {
            total_pages: result.total_pages(),
            failed_pages: result.failed_pages(),
            records_crawled: result.records().len(),
            rows_written: dataset.len(),
            duplicates_dropped: dataset.duplicates_dropped(),
            missing_id_dropped: dataset.missing_id_dropped(),
            categories_unavailable,
            errors_by_kind,
            affected_ids,
            duration_seconds: duration.num_milliseconds() as f64 / 1000.0,
        }
    }

    pub fn total_errors(&self) -> usize {
        self.errors_by_kind.values().sum()
    }
}

/// Prints the run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("{}", "=".repeat(60));
    println!("Crawl Summary\n");

    println!("Overview:");
    println!("  Listing pages: {}", summary.total_pages);
    println!("  Records crawled: {}", summary.records_crawled);
    println!("  Rows written: {}", summary.rows_written);
    println!("  Duplicates dropped: {}", summary.duplicates_dropped);
    println!("  Missing identifier dropped: {}", summary.missing_id_dropped);
    println!("  Categories unavailable: {}", summary.categories_unavailable);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!();

    if summary.total_errors() > 0 {
        println!("Error Summary ({}):", summary.total_errors());
        for (kind, count) in &summary.errors_by_kind {
            println!("  {}: {}", kind, count);
        }

        if !summary.failed_pages.is_empty() {
            let pages: Vec<String> = summary.failed_pages.iter().map(u32::to_string).collect();
            println!("  Failed pages: {}", pages.join(", "));
        }

        if !summary.affected_ids.is_empty() {
            println!("  Affected books: {}", summary.affected_ids.join(", "));
        }
    } else {
        println!("No errors recorded");
    }

    println!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookRecord, Category, CrawlError, Origin, Rating};
    use chrono::{Duration, Utc};
    use url::Url;

    fn record(id: &str, category: Category) -> BookRecord {
        BookRecord {
            id: id.to_string(),
            title: format!("Book {}", id),
            price: 10.0,
            rating: Rating::Four,
            availability: "In stock".to_string(),
            category,
            image_url: Url::parse("https://books.toscrape.com/media/x.jpg").unwrap(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let started = Utc::now();
        let finished = started + Duration::milliseconds(2500);
        let errors = vec![
            CrawlError::page(
                CrawlStage::Listing,
                CrawlErrorKind::Fetch,
                3,
                "https://books.toscrape.com/catalogue/page-3.html",
                "HTTP status 500",
            ),
            CrawlError::item(
                CrawlStage::Detail,
                CrawlErrorKind::Fetch,
                Origin::new(1, 1),
                Some("2".to_string()),
                "request timed out",
            ),
            CrawlError::item(
                CrawlStage::Listing,
                CrawlErrorKind::Field,
                Origin::new(2, 0),
                None,
                "invalid price",
            ),
        ];
        let records = vec![
            record("1", Category::Named("Poetry".to_string())),
            record("2", Category::Unavailable),
            record("1", Category::Named("Poetry".to_string())),
        ];
        let result = CrawlResult::new(records, errors, 3, started, finished);
        let dataset = Dataset::assemble(&result);

        let summary = RunSummary::new(&result, &dataset);
        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.failed_pages, vec![3]);
        assert_eq!(summary.records_crawled, 3);
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.duplicates_dropped, 1);
        assert_eq!(summary.categories_unavailable, 1);
        assert_eq!(summary.total_errors(), 3);
        assert_eq!(summary.errors_by_kind[&CrawlErrorKind::Fetch], 2);
        assert_eq!(summary.affected_ids, vec!["2".to_string()]);
        assert!((summary.duration_seconds - 2.5).abs() < f64::EPSILON);
    }
}
