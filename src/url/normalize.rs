use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes the configured catalog root into a base URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme
/// 3. Require a host
/// 4. Drop any query string and fragment
/// 5. Ensure the path ends with `/` so relative joins stay under the root
///
/// # Examples
///
/// ```
/// use book_harvest::url::normalize_base_url;
///
/// let url = normalize_base_url("https://books.toscrape.com").unwrap();
/// assert_eq!(url.as_str(), "https://books.toscrape.com/");
/// ```
pub fn normalize_base_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Resolves a possibly relative link against `base`
///
/// Dot segments such as `../` are collapsed by the join, so
/// `../../media/x.jpg` seen from `/catalogue/page-2.html` becomes `/media/x.jpg`.
/// Returns `None` for empty links, non-HTTP(S) results, and unparsable input.
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
