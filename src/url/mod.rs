//! URL handling module for Book-Harvest
//!
//! This module knows the catalog site's URL conventions: where listing pages
//! live, how relative links are resolved, and how a book identifier is
//! encoded in a detail-page slug.

mod normalize;
mod site;

// Re-export main functions
pub use normalize::{normalize_base_url, resolve_link};
pub use site::{listing_page_url, parse_book_id};
