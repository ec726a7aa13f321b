use url::Url;

/// Builds the URL of listing page `page` under the catalog root
///
/// Page 1 is the root itself; later pages live at `catalogue/page-<n>.html`.
pub fn listing_page_url(base_url: &Url, page: u32) -> Result<Url, url::ParseError> {
    if page <= 1 {
        Ok(base_url.clone())
    } else {
        base_url.join(&format!("catalogue/page-{}.html", page))
    }
}

/// Extracts the numeric book identifier from a detail-page link
///
/// Detail links follow `<slug>_<digits>/index.html`, e.g.
/// `catalogue/a-light-in-the-attic_1000/index.html` yields `"1000"`.
/// Returns `None` when there is no `_` separator or the trailing token is
/// not purely numeric.
pub fn parse_book_id(href: &str) -> Option<String> {
    let trimmed = href.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("index.html").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    let (_, token) = trimmed.rsplit_once('_')?;
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        Some(token.to_string())
    } else {
        None
    }
}
