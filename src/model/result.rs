//! Crawl error bookkeeping and the frozen result of one run

use crate::model::record::BookRecord;
use chrono::{DateTime, Utc};
use std::fmt;

/// Where an item or page was discovered
///
/// Ordering is page ascending, then position within the page ascending,
/// which is the canonical output order of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Origin {
    /// 1-based listing page number
    pub page: u32,

    /// 0-based position of the item on its listing page
    pub position: usize,
}

impl Origin {
    pub fn new(page: u32, position: usize) -> Self {
        Self { page, position }
    }
}

/// Pipeline stage in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStage {
    Pagination,
    Listing,
    Detail,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pagination => "pagination",
            Self::Listing => "listing",
            Self::Detail => "detail",
        };
        f.write_str(name)
    }
}

/// Kind of a non-fatal crawl failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CrawlErrorKind {
    /// Network error, timeout, or non-2xx status
    Fetch,

    /// Markup did not have the expected shape
    Parse,

    /// A field failed type conversion (e.g. price)
    Field,

    /// The detail-page slug did not contain a numeric identifier
    Identifier,
}

impl fmt::Display for CrawlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "FetchError",
            Self::Parse => "ParseError",
            Self::Field => "FieldError",
            Self::Identifier => "IdentifierError",
        };
        f.write_str(name)
    }
}

/// One recorded, non-fatal failure
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlError {
    pub stage: CrawlStage,
    pub kind: CrawlErrorKind,

    /// Listing page the failure belongs to
    pub page: u32,

    /// Item position on that page; `None` for page-level failures
    pub position: Option<usize>,

    /// Book identifier, when one was known
    pub book_id: Option<String>,

    /// URL that was being processed, when relevant
    pub url: Option<String>,

    pub message: String,
}

impl CrawlError {
    /// A failure affecting a whole listing page
    pub fn page(
        stage: CrawlStage,
        kind: CrawlErrorKind,
        page: u32,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            kind,
            page,
            position: None,
            book_id: None,
            url: Some(url.into()),
            message: message.into(),
        }
    }

    /// A failure affecting a single item
    pub fn item(
        stage: CrawlStage,
        kind: CrawlErrorKind,
        origin: Origin,
        book_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            kind,
            page: origin.page,
            position: Some(origin.position),
            book_id: book_id.filter(|id| !id.is_empty()),
            url: None,
            message: message.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sort key placing page-level errors before item errors of the same page
    fn sort_key(&self) -> (u32, Option<usize>, CrawlErrorKind) {
        (self.page, self.position, self.kind)
    }
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] page {}", self.stage, self.kind, self.page)?;
        if let Some(position) = self.position {
            write!(f, " item {}", position)?;
        }
        if let Some(id) = &self.book_id {
            write!(f, " (id {})", id)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// The frozen output of one crawl run
///
/// Records and errors are held in discovery order. A `CrawlResult` is never
/// mutated after construction; the coordinator builds it once all tasks finish.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    records: Vec<BookRecord>,
    errors: Vec<CrawlError>,
    total_pages: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Freezes a run's output
    ///
    /// `records` must already be in discovery order; `errors` are sorted here.
    pub fn new(
        records: Vec<BookRecord>,
        mut errors: Vec<CrawlError>,
        total_pages: u32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        errors.sort_by_key(|e| e.sort_key());
        Self {
            records,
            errors,
            total_pages,
            started_at,
            finished_at,
        }
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn errors(&self) -> &[CrawlError] {
        &self.errors
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Number of errors of the given kind
    pub fn count_errors(&self, kind: CrawlErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Listing pages that failed as a whole, ascending
    pub fn failed_pages(&self) -> Vec<u32> {
        self.errors
            .iter()
            .filter(|e| e.position.is_none())
            .map(|e| e.page)
            .collect()
    }
}
