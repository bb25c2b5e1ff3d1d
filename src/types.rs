use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One catalog item as scraped, before any validation.
///
/// Every field is optional: the crawler always fills them (falling back to
/// placeholder text), but a raw snapshot read back from disk may have empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<String>,
    #[serde(rename = "Colors")]
    pub colors: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<String>,
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "timestamp", default)]
    pub timestamp: Option<String>,
}

impl RawRecord {
    /// Values of the six required columns, in header order
    pub fn required_fields(&self) -> [&Option<String>; 6] {
        [
            &self.title,
            &self.price,
            &self.rating,
            &self.colors,
            &self.size,
            &self.gender,
        ]
    }
}

/// A validated, typed catalog item ready for the sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "Colors")]
    pub colors: i64,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "timestamp", default)]
    pub timestamp: Option<String>,
}

impl NormalizedRecord {
    /// Render back into raw text, the way the flat file stores it
    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            title: Some(self.title.clone()),
            price: Some(format_decimal(self.price)),
            rating: Some(format_decimal(self.rating)),
            colors: Some(self.colors.to_string()),
            size: Some(self.size.clone()),
            gender: Some(self.gender.clone()),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Plain decimal text that always keeps a fractional part ("1600000.0", "4.5").
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Source of catalog page HTML
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the HTML of a single catalog page (1-based)
    async fn fetch_page(&self, page: u32) -> Result<String>;
}
