//! Read-only query layer over a harvested dataset
//!
//! A [`Catalog`] is loaded once from the CSV written by a crawl and then
//! passed by reference to whatever answers lookups. It is never mutated after
//! loading.
//!
//! # Example
//!
//! ```no_run
//! use book_harvest::catalog::Catalog;
//! use std::path::Path;
//!
//! let catalog = Catalog::load(Path::new("data/livros.csv")).unwrap();
//! for entry in catalog.search(Some("attic"), None) {
//!     println!("{} - {}", entry.id, entry.title);
//! }
//! ```

mod query;

pub use query::{check_health, Catalog, CatalogEntry, CatalogHealth};

use thiserror::Error;

/// Catalog loading and lookup errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected dataset columns: {0}")]
    Schema(String),

    #[error("Book with id '{0}' not found")]
    NotFound(String),
}

impl CatalogError {
    /// Returns true for the 404-class lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
