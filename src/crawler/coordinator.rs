//! Crawler coordinator - main crawl orchestration logic
//!
//! A run moves through `Init → ListingFetch → DetailFetch → Finalized`:
//!
//! 1. **Init**: fetch listing page 1 and resolve the total page count. Failure
//!    here is fatal for the run.
//! 2. **ListingFetch**: one task per remaining listing page. Page 1 reuses the
//!    markup fetched during Init.
//! 3. **DetailFetch**: one task per surviving listing item, fetching its detail
//!    page for the category. Starts only after every listing task is done.
//! 4. **Finalized**: records and errors are sorted into discovery order and
//!    frozen into a [`CrawlResult`].
//!
//! Every task acquires a [`FetchPool`] slot before fetching. Task outcomes
//! come back over an `mpsc` completion channel and the coordinator loop is the
//! only code that touches the accumulator.

use crate::config::Config;
use crate::crawler::extractor::{extract_category, extract_listing, ExtractError};
use crate::crawler::fetcher::{FetchCause, FetchError, HttpFetcher, PageSource};
use crate::crawler::pagination::resolve_total_pages;
use crate::crawler::pool::FetchPool;
use crate::model::{
    BookRecord, Category, CrawlError, CrawlErrorKind, CrawlResult, CrawlStage, DetailFragment,
    ListingFragment, Origin,
};
use crate::url::{listing_page_url, normalize_base_url};
use crate::HarvestError;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Progress is logged every this many completed detail fetches
const PROGRESS_INTERVAL: usize = 50;

/// Page cap used unless the configuration sets one
const DEFAULT_MAX_PAGES: u32 = 1_000;

/// Why a listing or detail task produced nothing usable
#[derive(Debug)]
enum TaskFailure {
    Fetch(FetchError),
    Extract(ExtractError),
}

impl TaskFailure {
    fn kind(&self) -> CrawlErrorKind {
        match self {
            Self::Fetch(_) => CrawlErrorKind::Fetch,
            Self::Extract(e) => e.kind(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Extract(e) => write!(f, "{}", e),
        }
    }
}

/// Completion message of one listing task
struct ListingOutcome {
    page: u32,
    url: Url,
    items: Result<Vec<Result<ListingFragment, ExtractError>>, TaskFailure>,
}

/// Completion message of one detail task
struct DetailOutcome {
    slot: usize,
    category: Result<Category, TaskFailure>,
}

/// Mutable state of a run in progress, owned by the coordinator loop
#[derive(Default)]
struct Accumulator {
    /// Listing fragments awaiting their detail stage, indexed by slot
    pending: Vec<Option<(Origin, ListingFragment)>>,
    records: Vec<(Origin, BookRecord)>,
    errors: Vec<CrawlError>,
}

impl Accumulator {
    fn absorb_listing(&mut self, outcome: ListingOutcome) {
        let ListingOutcome { page, url, items } = outcome;

        let items = match items {
            Ok(items) => items,
            Err(failure) => {
                tracing::warn!("Listing page {} failed: {}", page, failure);
                self.errors.push(CrawlError::page(
                    CrawlStage::Listing,
                    failure.kind(),
                    page,
                    url.as_str(),
                    failure.to_string(),
                ));
                return;
            }
        };

        tracing::debug!("Listing page {} yielded {} items", page, items.len());

        for (position, item) in items.into_iter().enumerate() {
            let origin = Origin::new(page, position);
            match item {
                Ok(fragment) => {
                    if fragment.id.is_empty() {
                        let failure = ExtractError::Identifier(fragment.detail_url.to_string());
                        tracing::warn!("Page {} item {}: {}", page, position, failure);
                        self.errors.push(
                            CrawlError::item(
                                CrawlStage::Listing,
                                failure.kind(),
                                origin,
                                None,
                                failure.to_string(),
                            )
                            .with_url(fragment.detail_url.as_str()),
                        );
                    }
                    self.pending.push(Some((origin, fragment)));
                }
                Err(failure) => {
                    tracing::warn!("Page {} item {} skipped: {}", page, position, failure);
                    self.errors.push(
                        CrawlError::item(
                            CrawlStage::Listing,
                            failure.kind(),
                            origin,
                            None,
                            failure.to_string(),
                        )
                        .with_url(url.as_str()),
                    );
                }
            }
        }
    }

    fn absorb_detail(&mut self, outcome: DetailOutcome) {
        let Some((origin, fragment)) = self.pending.get_mut(outcome.slot).and_then(Option::take)
        else {
            tracing::warn!("Detail outcome for unknown slot {}", outcome.slot);
            return;
        };

        let category = match outcome.category {
            Ok(category) => category,
            Err(failure) => {
                tracing::warn!(
                    "Category unavailable for book {} ({}): {}",
                    fragment.id,
                    fragment.detail_url,
                    failure
                );
                self.errors.push(
                    CrawlError::item(
                        CrawlStage::Detail,
                        failure.kind(),
                        origin,
                        Some(fragment.id.clone()),
                        failure.to_string(),
                    )
                    .with_url(fragment.detail_url.as_str()),
                );
                Category::Unavailable
            }
        };

        let detail = DetailFragment {
            id: fragment.id.clone(),
            category,
        };
        self.records.push((origin, BookRecord::merge(fragment, detail)));
    }

    /// Settles slots whose detail task never reported back
    fn abandon_pending(&mut self) {
        let stranded: Vec<usize> = self
            .pending
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|_| slot))
            .collect();

        for slot in stranded {
            let url = self.pending[slot]
                .as_ref()
                .map(|(_, fragment)| fragment.detail_url.clone());
            if let Some(url) = url {
                self.absorb_detail(DetailOutcome {
                    slot,
                    category: Err(TaskFailure::Fetch(FetchError::new(
                        &url,
                        FetchCause::Request("detail task aborted".to_string()),
                    ))),
                });
            }
        }
    }

    fn finalize(mut self, total_pages: u32, started_at: chrono::DateTime<Utc>) -> CrawlResult {
        self.records.sort_by_key(|(origin, _)| *origin);
        let records = self.records.into_iter().map(|(_, record)| record).collect();
        CrawlResult::new(records, self.errors, total_pages, started_at, Utc::now())
    }
}

/// Acquires a pool slot, fetches, and releases the slot
async fn fetch_with_permit<S: PageSource>(
    pool: &FetchPool,
    source: &S,
    url: &Url,
) -> Result<String, FetchError> {
    let _permit = pool
        .acquire()
        .await
        .map_err(|e| FetchError::new(url, FetchCause::Request(e.to_string())))?;
    source.fetch(url).await
}

/// Main crawler coordinator structure
pub struct Coordinator<S: PageSource> {
    source: Arc<S>,
    pool: FetchPool,
    base_url: Url,
    max_pages: u32,
}

impl Coordinator<HttpFetcher> {
    /// Creates an HTTP-backed coordinator from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid base URL or HTTP client construction failed
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let base_url = normalize_base_url(&config.site.base_url)?;
        let fetcher = HttpFetcher::from_config(&config.site, &config.crawler)?;
        Ok(Self::new(
            fetcher,
            base_url,
            config.crawler.max_concurrent_fetches as usize,
        )
        .with_max_pages(config.crawler.max_pages))
    }
}

impl<S: PageSource> Coordinator<S> {
    /// Creates a coordinator over any page source
    ///
    /// # Arguments
    ///
    /// * `source` - Where page markup comes from
    /// * `base_url` - Catalog root (normalized, ending in `/`)
    /// * `max_concurrent` - Pool size shared by both fetch stages
    pub fn new(source: S, base_url: Url, max_concurrent: usize) -> Self {
        Self {
            source: Arc::new(source),
            pool: FetchPool::new(max_concurrent),
            base_url,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Caps how many listing pages are crawled (at least one)
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// The fetch pool, for inspecting in-flight and peak counts
    pub fn pool(&self) -> &FetchPool {
        &self.pool
    }

    /// Runs one complete crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The run finished; item and page failures are in its error list
    /// * `Err(HarvestError)` - Listing page 1 was unreachable or its page count unreadable
    pub async fn run(&self) -> Result<CrawlResult, HarvestError> {
        let started_at = Utc::now();
        tracing::info!("Starting crawl of {}", self.base_url);

        let first_url = listing_page_url(&self.base_url, 1)?;
        let first_markup = fetch_with_permit(&self.pool, self.source.as_ref(), &first_url)
            .await
            .map_err(HarvestError::CatalogUnreachable)?;
        let claimed_pages =
            resolve_total_pages(&first_markup).map_err(HarvestError::Pagination)?;

        let mut acc = Accumulator::default();

        let total_pages = if claimed_pages > self.max_pages {
            let message = format!(
                "page counter claims {} pages, crawling only the first {}",
                claimed_pages, self.max_pages
            );
            tracing::warn!("{}", message);
            acc.errors.push(CrawlError::page(
                CrawlStage::Pagination,
                CrawlErrorKind::Parse,
                1,
                first_url.as_str(),
                message,
            ));
            self.max_pages
        } else {
            claimed_pages
        };
        tracing::info!("Catalog has {} listing pages", total_pages);

        self.listing_stage(&mut acc, first_url, first_markup, total_pages)
            .await?;
        tracing::info!(
            "Listing stage complete: {} items to enrich, {} errors so far",
            acc.pending.len(),
            acc.errors.len()
        );

        self.detail_stage(&mut acc).await;

        let result = acc.finalize(total_pages, started_at);
        tracing::info!(
            "Crawl finished: {} records, {} errors",
            result.records().len(),
            result.errors().len()
        );
        Ok(result)
    }

    /// Fans out over listing pages and drains every result before returning
    async fn listing_stage(
        &self,
        acc: &mut Accumulator,
        first_url: Url,
        first_markup: String,
        total_pages: u32,
    ) -> Result<(), HarvestError> {
        let (tx, mut rx) = mpsc::channel::<ListingOutcome>(self.pool.capacity() * 2);

        for page in 2..=total_pages {
            let url = listing_page_url(&self.base_url, page)?;
            let tx = tx.clone();
            let pool = self.pool.clone();
            let source = Arc::clone(&self.source);
            let base_url = self.base_url.clone();

            tokio::spawn(async move {
                let items = match fetch_with_permit(&pool, source.as_ref(), &url).await {
                    Ok(markup) => {
                        extract_listing(&markup, &url, &base_url).map_err(TaskFailure::Extract)
                    }
                    Err(e) => Err(TaskFailure::Fetch(e)),
                };
                // The receiver outlives every sender; a send error means the run was dropped
                let _ = tx.send(ListingOutcome { page, url, items }).await;
            });
        }
        drop(tx);

        let first_items = extract_listing(&first_markup, &first_url, &self.base_url)
            .map_err(TaskFailure::Extract);
        acc.absorb_listing(ListingOutcome {
            page: 1,
            url: first_url,
            items: first_items,
        });

        let mut pages_done = 1;
        while let Some(outcome) = rx.recv().await {
            acc.absorb_listing(outcome);
            pages_done += 1;
            tracing::debug!("Listing pages done: {}/{}", pages_done, total_pages);
        }

        Ok(())
    }

    /// Fans out over discovered items and merges each category into its record
    async fn detail_stage(&self, acc: &mut Accumulator) {
        let total = acc.pending.len();
        let (tx, mut rx) = mpsc::channel::<DetailOutcome>(self.pool.capacity() * 2);

        for (slot, entry) in acc.pending.iter().enumerate() {
            let Some((_, fragment)) = entry else {
                continue;
            };
            let url = fragment.detail_url.clone();
            let tx = tx.clone();
            let pool = self.pool.clone();
            let source = Arc::clone(&self.source);

            tokio::spawn(async move {
                let category = match fetch_with_permit(&pool, source.as_ref(), &url).await {
                    Ok(markup) => extract_category(&markup).map_err(TaskFailure::Extract),
                    Err(e) => Err(TaskFailure::Fetch(e)),
                };
                let _ = tx.send(DetailOutcome { slot, category }).await;
            });
        }
        drop(tx);

        let mut done = 0;
        while let Some(outcome) = rx.recv().await {
            acc.absorb_detail(outcome);
            done += 1;
            if done % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {}/{} detail pages, peak {} concurrent fetches",
                    done,
                    total,
                    self.pool.peak()
                );
            }
        }

        acc.abandon_pending();
    }
}

/// Runs a complete crawl from configuration
///
/// # Example
///
/// ```no_run
/// use book_harvest::config::Config;
/// use book_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let result = run_crawl(&Config::default()).await?;
/// println!("{} books", result.records().len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlResult, HarvestError> {
    let coordinator = Coordinator::from_config(config)?;
    coordinator.run().await
}
