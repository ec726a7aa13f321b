use crate::catalog::CatalogError;
use crate::output::{COLUMNS, UTF8_BOM};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// One dataset row as read back from CSV
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "preco")]
    pub price: f64,
    pub rating: String,
    #[serde(rename = "disponibilidade")]
    pub availability: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "imagem")]
    pub image: String,
}

/// Load status of a dataset file
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogHealth {
    pub path: PathBuf,
    pub file_exists: bool,
    pub loaded: bool,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Load error message, if loading failed
    pub error: Option<String>,
}

impl CatalogHealth {
    pub fn is_healthy(&self) -> bool {
        self.file_exists && self.loaded && self.rows > 0
    }
}

/// Immutable, id-indexed view of a dataset
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
    columns: Vec<String>,
}

impl Catalog {
    /// Loads a dataset file
    ///
    /// # Returns
    ///
    /// * `Ok(Catalog)` - File read, header matched, rows parsed
    /// * `Err(CatalogError)` - Unreadable file, wrong columns, or a malformed row
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = std::fs::read(path)?;
        let catalog = Self::from_csv(&bytes)?;
        tracing::info!(
            "Loaded {} books from {}",
            catalog.entries.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses dataset bytes; a leading BOM is optional
    pub fn from_csv(bytes: &[u8]) -> Result<Self, CatalogError> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::Reader::from_reader(body);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns != COLUMNS {
            return Err(CatalogError::Schema(columns.join(",")));
        }

        let mut entries = Vec::new();
        let mut by_id = HashMap::new();
        for row in reader.deserialize::<CatalogEntry>() {
            let entry = row?;
            // First row wins, matching the assembler's dedup rule
            by_id.entry(entry.id.clone()).or_insert(entries.len());
            entries.push(entry);
        }

        Ok(Self {
            entries,
            by_id,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// All `(id, title)` pairs in file order
    pub fn titles(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.id.as_str(), e.title.as_str()))
            .collect()
    }

    /// Case-insensitive substring search on title and/or category
    ///
    /// A `None` filter matches everything.
    pub fn search(&self, title: Option<&str>, category: Option<&str>) -> Vec<&CatalogEntry> {
        let title = title.map(str::to_lowercase);
        let category = category.map(str::to_lowercase);

        self.entries
            .iter()
            .filter(|e| {
                title
                    .as_deref()
                    .map_or(true, |t| e.title.to_lowercase().contains(t))
            })
            .filter(|e| {
                category
                    .as_deref()
                    .map_or(true, |c| e.category.to_lowercase().contains(c))
            })
            .collect()
    }

    /// Full record for `id`
    pub fn get(&self, id: &str) -> Result<&CatalogEntry, CatalogError> {
        self.by_id
            .get(id)
            .and_then(|&index| self.entries.get(index))
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Distinct categories, sorted lexicographically
    pub fn categories(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Reports whether the dataset at `path` exists and loads
pub fn check_health(path: &Path) -> CatalogHealth {
    let file_exists = path.exists();
    match Catalog::load(path) {
        Ok(catalog) => CatalogHealth {
            path: path.to_path_buf(),
            file_exists,
            loaded: true,
            rows: catalog.len(),
            columns: catalog.columns().to_vec(),
            error: None,
        },
        Err(e) => CatalogHealth {
            path: path.to_path_buf(),
            file_exists,
            loaded: false,
            rows: 0,
            columns: vec![],
            error: Some(e.to_string()),
        },
    }
}
