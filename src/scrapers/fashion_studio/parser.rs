use chrono::Local;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::constants::{INVALID_RATING, PRICE_UNAVAILABLE, UNKNOWN_FIELD, UNKNOWN_TITLE};
use crate::types::RawRecord;

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse(".collection-card").expect("card selector"));
static DETAILS: Lazy<Selector> = Lazy::new(|| Selector::parse(".product-details").expect("details selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("title selector"));
static INFO: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("info selector"));
static PRICE: Lazy<Selector> = Lazy::new(|| Selector::parse(".price-container .price").expect("price selector"));

/// Capture time stamped on every scraped card
pub fn capture_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Extract every product card on a catalog page
pub fn parse_products(html: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let products: Vec<RawRecord> = document
        .select(&CARD)
        .map(|card| parse_product_card(card, capture_timestamp()))
        .collect();
    debug!("Found {} product cards on page", products.len());
    products
}

/// Read one `.collection-card`. Fields that are absent from the markup fall
/// back to their placeholder text instead of failing.
pub fn parse_product_card(card: ElementRef<'_>, timestamp: String) -> RawRecord {
    let Some(details) = card.select(&DETAILS).next() else {
        warn!("Could not find product-details");
        return placeholder(timestamp);
    };

    let title = details
        .select(&TITLE)
        .next()
        .map(text_of)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let mut rating = INVALID_RATING.to_string();
    let mut colors = UNKNOWN_FIELD.to_string();
    let mut size = UNKNOWN_FIELD.to_string();
    let mut gender = UNKNOWN_FIELD.to_string();

    for info in details.select(&INFO) {
        let text = text_of(info);
        if text.contains("Rating:") {
            rating = text
                .rsplit("Rating:")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        } else if text.contains("Color") {
            colors = text;
        } else if text.contains("Size:") {
            size = text;
        } else if text.contains("Gender:") {
            gender = text;
        }
    }

    let price = card
        .select(&PRICE)
        .next()
        .map(text_of)
        .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string());

    RawRecord {
        title: Some(title),
        price: Some(price),
        rating: Some(rating),
        colors: Some(colors),
        size: Some(size),
        gender: Some(gender),
        timestamp: Some(timestamp),
    }
}

fn placeholder(timestamp: String) -> RawRecord {
    RawRecord {
        title: Some(UNKNOWN_TITLE.to_string()),
        price: Some(PRICE_UNAVAILABLE.to_string()),
        rating: Some(INVALID_RATING.to_string()),
        colors: Some(UNKNOWN_FIELD.to_string()),
        size: Some(UNKNOWN_FIELD.to_string()),
        gender: Some(UNKNOWN_FIELD.to_string()),
        timestamp: Some(timestamp),
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="collection-grid">
            <div class="collection-card">
              <div class="product-details">
                <h3 class="product-title">T-shirt 2</h3>
                <div class="price-container"><span class="price">$102.15</span></div>
                <p style="font-size: 14px;">Rating: ⭐ 3.9 / 5</p>
                <p style="font-size: 14px;">3 Colors</p>
                <p style="font-size: 14px;">Size: M</p>
                <p style="font-size: 14px;">Gender: Women</p>
              </div>
            </div>
            <div class="collection-card">
              <div class="product-details">
                <h3 class="product-title">Unknown Product</h3>
                <p class="price">Price Unavailable</p>
                <p>Rating: Not Rated</p>
                <p>5 Colors</p>
                <p>Size: M</p>
                <p>Gender: Men</p>
              </div>
            </div>
            <div class="collection-card">
              <img src="broken.png">
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_products_reads_every_card() {
        let products = parse_products(PAGE);
        assert_eq!(products.len(), 3);

        let first = &products[0];
        assert_eq!(first.title.as_deref(), Some("T-shirt 2"));
        assert_eq!(first.price.as_deref(), Some("$102.15"));
        assert_eq!(first.rating.as_deref(), Some("⭐ 3.9 / 5"));
        assert_eq!(first.colors.as_deref(), Some("3 Colors"));
        assert_eq!(first.size.as_deref(), Some("Size: M"));
        assert_eq!(first.gender.as_deref(), Some("Gender: Women"));
        assert!(first.timestamp.as_deref().is_some_and(|t| t.contains('T')));
    }

    #[test]
    fn test_missing_price_container_falls_back() {
        let products = parse_products(PAGE);
        let second = &products[1];
        assert_eq!(second.price.as_deref(), Some(PRICE_UNAVAILABLE));
        assert_eq!(second.rating.as_deref(), Some("Not Rated"));
    }

    #[test]
    fn test_card_without_details_is_all_placeholders() {
        let products = parse_products(PAGE);
        let third = &products[2];
        assert_eq!(third.title.as_deref(), Some(UNKNOWN_TITLE));
        assert_eq!(third.price.as_deref(), Some(PRICE_UNAVAILABLE));
        assert_eq!(third.rating.as_deref(), Some(INVALID_RATING));
        assert_eq!(third.colors.as_deref(), Some(UNKNOWN_FIELD));
        assert_eq!(third.size.as_deref(), Some(UNKNOWN_FIELD));
        assert_eq!(third.gender.as_deref(), Some(UNKNOWN_FIELD));
    }

    #[test]
    fn test_page_without_cards() {
        assert!(parse_products("<html><body><p>Maintenance</p></body></html>").is_empty());
    }
}
