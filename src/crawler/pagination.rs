//! Catalog page count discovery

use crate::crawler::extractor::ExtractError;
use scraper::{Html, Selector};

/// Determines how many listing pages the catalog has
///
/// Reads the pagination indicator (`<li class="current">Page 1 of 50</li>`)
/// and returns its trailing number. A catalog without the indicator has a
/// single page.
///
/// # Returns
///
/// * `Ok(n)` - Total page count, at least 1
/// * `Err(ExtractError::Parse)` - The indicator exists but does not end in a number
///
/// # Example
///
/// ```
/// use book_harvest::crawler::resolve_total_pages;
///
/// let html = r#"<ul class="pager"><li class="current">Page 3 of 50</li></ul>"#;
/// assert_eq!(resolve_total_pages(html).unwrap(), 50);
/// ```
pub fn resolve_total_pages(html: &str) -> Result<u32, ExtractError> {
    let current = Selector::parse("li.current")
        .map_err(|e| ExtractError::Parse(format!("pagination selector: {:?}", e)))?;
    let document = Html::parse_document(html);

    let Some(indicator) = document.select(&current).next() else {
        return Ok(1);
    };

    let text = indicator.text().collect::<String>();
    let total = text
        .split_whitespace()
        .last()
        .and_then(|token| token.parse::<u32>().ok())
        .ok_or_else(|| {
            ExtractError::Parse(format!("unreadable pagination indicator {:?}", text.trim()))
        })?;

    Ok(total.max(1))
}
