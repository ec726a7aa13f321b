//! Dataset assembly and CSV serialization
//!
//! The CSV produced here is the contract with the catalog query layer:
//! UTF-8 with a byte-order mark, comma-delimited, one header row.

use crate::model::{BookRecord, CrawlResult};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;

/// UTF-8 byte-order mark written before the header row
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Dataset columns, in file order
pub const COLUMNS: [&str; 7] = [
    "id",
    "titulo",
    "preco",
    "rating",
    "disponibilidade",
    "categoria",
    "imagem",
];

/// The deduplicated, ordered rows of one run
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<BookRecord>,
    duplicates_dropped: usize,
    missing_id_dropped: usize,
}

impl Dataset {
    /// Builds the dataset from a finished crawl
    ///
    /// Records without an identifier are dropped (their failure is already in
    /// the crawl's error list). Of several records sharing an identifier, the
    /// first in discovery order is kept.
    pub fn assemble(result: &CrawlResult) -> Self {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(result.records().len());
        let mut duplicates_dropped = 0;
        let mut missing_id_dropped = 0;

        for record in result.records() {
            if record.id.is_empty() {
                missing_id_dropped += 1;
                continue;
            }
            if !seen.insert(record.id.as_str()) {
                tracing::debug!("Dropping duplicate book {}", record.id);
                duplicates_dropped += 1;
                continue;
            }
            rows.push(record.clone());
        }

        Self {
            rows,
            duplicates_dropped,
            missing_id_dropped,
        }
    }

    pub fn rows(&self) -> &[BookRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records removed because another record had the same identifier
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Records removed because their identifier could not be parsed
    pub fn missing_id_dropped(&self) -> usize {
        self.missing_id_dropped
    }

    /// Serializes the dataset to CSV bytes, BOM first
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, HarvestError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
        writer.write_record(COLUMNS)?;
        for record in &self.rows {
            writer.write_record(csv_record(record))?;
        }
        writer
            .into_inner()
            .map_err(|e| HarvestError::Io(e.into_error()))
    }

    /// Writes the dataset to `path`, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<(), HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_csv_bytes()?)?;
        tracing::info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// One CSV row, in [`COLUMNS`] order
fn csv_record(record: &BookRecord) -> [String; 7] {
    [
        record.id.clone(),
        record.title.clone(),
        format_price(record.price),
        record.rating.to_string(),
        record.availability.clone(),
        record.category.to_string(),
        record.image_url.to_string(),
    ]
}

/// Two decimals when that is exact, otherwise the shortest lossless form
fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price);
    if fixed.parse::<f64>() == Ok(price) {
        fixed
    } else {
        price.to_string()
    }
}
