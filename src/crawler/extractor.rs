//! Markup extraction for listing and detail pages
//!
//! Both operations are pure: they take markup and return typed results,
//! leaving every include/exclude decision to the coordinator.
//!
//! # Listing item shape
//!
//! ```html
//! <article class="product_pod">
//!   <div class="image_container"><a href="..."><img src="../media/cache/x.jpg"></a></div>
//!   <p class="star-rating Three"></p>
//!   <h3><a href="a-light-in-the-attic_1000/index.html" title="A Light in the Attic">...</a></h3>
//!   <div class="product_price">
//!     <p class="price_color">£51.77</p>
//!     <p class="instock availability">In stock</p>
//!   </div>
//! </article>
//! ```

use crate::model::{Category, CrawlErrorKind, ListingFragment, Rating};
use crate::url::{parse_book_id, resolve_link};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Extraction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// An expected element or attribute is missing
    #[error("unexpected markup: {0}")]
    Parse(String),

    /// A field was present but could not be converted
    #[error("invalid {field} value {value:?}")]
    Field { field: &'static str, value: String },

    /// The detail link carries no numeric identifier
    #[error("no numeric identifier in link {0}")]
    Identifier(String),
}

impl ExtractError {
    /// The crawl error kind this failure is reported as
    pub fn kind(&self) -> CrawlErrorKind {
        match self {
            Self::Parse(_) => CrawlErrorKind::Parse,
            Self::Field { .. } => CrawlErrorKind::Field,
            Self::Identifier(_) => CrawlErrorKind::Identifier,
        }
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse(format!("selector {:?}: {:?}", css, e)))
}

/// Selectors for one listing item, built once per page
struct ListingSelectors {
    item: Selector,
    title_link: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
    image: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            item: selector("article.product_pod")?,
            title_link: selector("h3 a")?,
            price: selector("p.price_color")?,
            rating: selector("p.star-rating")?,
            availability: selector("p.availability")?,
            image: selector("img[src]")?,
        })
    }
}

/// Extracts every item on a listing page, in document order
///
/// Each entry is either a fragment or the reason that item must be skipped.
/// An item whose link has no numeric identifier is still returned, with an
/// empty `id`, so the failure stays visible downstream.
///
/// # Arguments
///
/// * `html` - Listing page markup
/// * `page_url` - URL the markup was fetched from; detail links are relative to it
/// * `base_url` - Catalog root; image paths are resolved against it
///
/// # Returns
///
/// * `Ok(items)` - Zero or more per-item outcomes
/// * `Err(ExtractError)` - The page itself could not be processed
pub fn extract_listing(
    html: &str,
    page_url: &Url,
    base_url: &Url,
) -> Result<Vec<Result<ListingFragment, ExtractError>>, ExtractError> {
    let selectors = ListingSelectors::new()?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selectors.item)
        .map(|item| extract_item(item, &selectors, page_url, base_url))
        .collect())
}

fn extract_item(
    item: ElementRef<'_>,
    selectors: &ListingSelectors,
    page_url: &Url,
    base_url: &Url,
) -> Result<ListingFragment, ExtractError> {
    let link = item
        .select(&selectors.title_link)
        .next()
        .ok_or_else(|| ExtractError::Parse("item has no title link".to_string()))?;

    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ExtractError::Parse("title link has no href".to_string()))?;

    let detail_url = resolve_link(href, page_url)
        .ok_or_else(|| ExtractError::Parse(format!("unresolvable detail link {:?}", href)))?;

    let id = parse_book_id(href).unwrap_or_default();

    let title = link
        .value()
        .attr("title")
        .map(str::trim)
        .ok_or_else(|| ExtractError::Parse("title link has no title attribute".to_string()))?
        .to_string();

    let price_text = item
        .select(&selectors.price)
        .next()
        .map(element_text)
        .ok_or_else(|| ExtractError::Parse("item has no price".to_string()))?;

    let price = parse_price(&price_text).ok_or_else(|| ExtractError::Field {
        field: "price",
        value: price_text.clone(),
    })?;

    let rating = item
        .select(&selectors.rating)
        .next()
        .and_then(|p| p.value().classes().find(|class| *class != "star-rating"))
        .map(Rating::from_class_token)
        .unwrap_or(Rating::Unknown);

    let availability = item
        .select(&selectors.availability)
        .next()
        .map(element_text)
        .ok_or_else(|| ExtractError::Parse("item has no availability".to_string()))?;

    let image_url = item
        .select(&selectors.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| resolve_link(src, base_url))
        .ok_or_else(|| ExtractError::Parse("item has no usable image".to_string()))?;

    Ok(ListingFragment {
        id,
        title,
        price,
        rating,
        availability,
        image_url,
        detail_url,
    })
}

/// Parses a price such as `£51.77`, stripping the leading currency symbol
///
/// Only symbol characters are stripped; a leading sign or decimal point is
/// part of the amount.
pub fn parse_price(text: &str) -> Option<f64> {
    let amount = text
        .trim()
        .trim_start_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')));
    amount.parse::<f64>().ok().filter(|price| price.is_finite())
}

/// Text content with runs of whitespace collapsed and ends trimmed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts a book's category from its detail page breadcrumb
///
/// The breadcrumb reads `Home / Books / <Category> / <Title>` with the title
/// as plain text, so the category is the third link. The position is fixed;
/// a site with a different breadcrumb depth would yield the wrong entry.
///
/// # Returns
///
/// * `Ok(Category::Named)` - At least three breadcrumb links, even if the third is blank
/// * `Ok(Category::Uncategorized)` - Fewer than three links
/// * `Err(ExtractError::Parse)` - No breadcrumb at all
pub fn extract_category(html: &str) -> Result<Category, ExtractError> {
    let breadcrumb_selector = selector("ul.breadcrumb")?;
    let entry_selector = selector("a")?;
    let document = Html::parse_document(html);

    let breadcrumb = document
        .select(&breadcrumb_selector)
        .next()
        .ok_or_else(|| ExtractError::Parse("no breadcrumb navigation".to_string()))?;

    let entries: Vec<String> = breadcrumb.select(&entry_selector).map(element_text).collect();

    match entries.get(2) {
        Some(name) => Ok(Category::Named(name.clone())),
        None => Ok(Category::Uncategorized),
    }
}
