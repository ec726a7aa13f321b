//! Book record definitions for the listing and detail stages
use std::fmt;
use url::Url;

/// Category text written when the breadcrumb is too shallow to hold one
pub const UNCATEGORIZED: &str = "Sem categoria";

/// Category text written when the detail page could not be fetched or parsed
pub const CATEGORY_UNAVAILABLE: &str = "Erro ao obter";

/// Star rating on the site's five-level scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    One,
    Two,
    Three,
    Four,
    Five,
    /// No recognizable rating class on the item
    Unknown,
}

impl Rating {
    /// Maps a rating class token (`One`..`Five`) to a rating
    ///
    /// Any other token yields `Unknown`.
    pub fn from_class_token(token: &str) -> Self {
        match token {
            "One" => Self::One,
            "Two" => Self::Two,
            "Three" => Self::Three,
            "Four" => Self::Four,
            "Five" => Self::Five,
            _ => Self::Unknown,
        }
    }

    /// Returns the 1-5 ordinal, or `None` for `Unknown`
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Self::One => Some(1),
            Self::Two => Some(2),
            Self::Three => Some(3),
            Self::Four => Some(4),
            Self::Five => Some(5),
            Self::Unknown => None,
        }
    }

    /// Returns the dataset rendering: the English word or `N/A`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "One",
            Self::Two => "Two",
            Self::Three => "Three",
            Self::Four => "Four",
            Self::Five => "Five",
            Self::Unknown => "N/A",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category obtained from a book's detail page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Category read from the breadcrumb
    Named(String),

    /// Breadcrumb present but too shallow to contain a category
    Uncategorized,

    /// Detail page could not be fetched or had no breadcrumb at all
    Unavailable,
}

impl Category {
    /// Returns the dataset rendering of this category
    pub fn as_str(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Uncategorized => UNCATEGORIZED,
            Self::Unavailable => CATEGORY_UNAVAILABLE,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields obtainable from one item on a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFragment {
    /// Numeric identifier from the detail-page slug; empty if it could not be parsed
    pub id: String,

    pub title: String,

    /// Price with the currency symbol stripped
    pub price: f64,

    pub rating: Rating,

    pub availability: String,

    /// Absolute cover image URL
    pub image_url: Url,

    /// Absolute detail-page URL, used only to fetch the detail stage
    pub detail_url: Url,
}

/// Fields obtainable from one detail page
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFragment {
    pub id: String,
    pub category: Category,
}

/// A complete book record: one listing fragment plus its category
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub rating: Rating,
    pub availability: String,
    pub category: Category,
    pub image_url: Url,
}

impl BookRecord {
    /// Merges a listing fragment with the detail fragment sharing its identifier
    ///
    /// The detail stage only adds the category; nothing from the listing is replaced.
    pub fn merge(listing: ListingFragment, detail: DetailFragment) -> Self {
        debug_assert_eq!(listing.id, detail.id);
        Self {
            id: listing.id,
            title: listing.title,
            price: listing.price,
            rating: listing.rating,
            availability: listing.availability,
            category: detail.category,
            image_url: listing.image_url,
        }
    }
}
