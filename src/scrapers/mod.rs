pub mod fashion_studio;

use std::path::PathBuf;
use std::time::Duration;

use metrics::counter;
use tracing::{error, info, instrument, warn};

use crate::config::SourceConfig;
use crate::types::{PageFetcher, RawRecord};

/// Crawl settings for one run
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub max_pages: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub page_delay: Duration,
    pub debug_html_path: Option<PathBuf>,
}

impl From<&SourceConfig> for ScrapeOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            page_delay: config.page_delay(),
            debug_html_path: config.debug_html_path.clone(),
        }
    }
}

/// Result of crawling every page
#[derive(Debug, Default)]
pub struct ScrapeResult {
    pub records: Vec<RawRecord>,
    pub pages_fetched: u32,
    /// Pages that still failed after every retry
    pub failed_pages: Vec<u32>,
}

/// Fetch pages `1..=max_pages` in order and collect every product card.
///
/// A page that keeps failing after its retries is skipped; the crawl itself
/// never fails once the fetcher exists.
#[instrument(skip_all, fields(max_pages = options.max_pages))]
pub async fn scrape_all_pages(fetcher: &dyn PageFetcher, options: &ScrapeOptions) -> ScrapeResult {
    let mut result = ScrapeResult::default();

    for page in 1..=options.max_pages {
        info!("Scraping page {} of {}", page, options.max_pages);

        let Some(html) = fetch_with_retry(fetcher, page, options).await else {
            error!("Failed to get content from page {} after retries", page);
            counter!("catalog_etl_pages_failed_total").increment(1);
            result.failed_pages.push(page);
            continue;
        };
        counter!("catalog_etl_pages_fetched_total").increment(1);
        result.pages_fetched += 1;

        if page == 1 {
            if let Some(path) = &options.debug_html_path {
                if let Err(e) = tokio::fs::write(path, &html).await {
                    warn!("Could not write debug HTML to {}: {}", path.display(), e);
                }
            }
        }

        let products = fashion_studio::parse_products(&html);
        info!("Found {} products on page {}", products.len(), page);
        result.records.extend(products);

        tokio::time::sleep(options.page_delay).await;
    }

    if result.records.is_empty() {
        warn!("No products were scraped!");
    } else {
        info!("Total products scraped: {}", result.records.len());
    }
    result
}

/// One attempt plus up to `max_retries` more, with a fixed delay in between.
/// An empty body counts as a failure.
async fn fetch_with_retry(fetcher: &dyn PageFetcher, page: u32, options: &ScrapeOptions) -> Option<String> {
    match fetcher.fetch_page(page).await {
        Ok(html) if !html.is_empty() => return Some(html),
        Ok(_) => warn!("Empty response for page {}", page),
        Err(e) => warn!("{}", e),
    }

    for attempt in 1..=options.max_retries {
        info!("Retrying page {} (attempt {}/{})", page, attempt, options.max_retries);
        counter!("catalog_etl_page_retries_total").increment(1);
        tokio::time::sleep(options.retry_delay).await;

        match fetcher.fetch_page(page).await {
            Ok(html) if !html.is_empty() => return Some(html),
            Ok(_) => warn!("Empty response for page {}", page),
            Err(e) => warn!("{}", e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EtlError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CARD_PAGE: &str = r#"
        <div class="collection-card"><div class="product-details">
          <h3>Pants 7</h3>
          <div class="price-container"><span class="price">$250.00</span></div>
          <p>Rating: ⭐ 4.1 / 5</p><p>8 Colors</p><p>Size: XL</p><p>Gender: Men</p>
        </div></div>
    "#;

    /// Serves canned pages, failing each page a configured number of times first
    struct ScriptedFetcher {
        failures_left: Mutex<HashMap<u32, u32>>,
        calls: Mutex<Vec<u32>>,
    }

    impl ScriptedFetcher {
        fn new(failures: &[(u32, u32)]) -> Self {
            Self {
                failures_left: Mutex::new(failures.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, page: u32) -> Result<String> {
            self.calls.lock().unwrap().push(page);
            let mut failures = self.failures_left.lock().unwrap();
            if let Some(left) = failures.get_mut(&page) {
                if *left > 0 {
                    *left -= 1;
                    return Err(EtlError::Fetch {
                        page,
                        message: "connection reset".to_string(),
                    });
                }
            }
            Ok(CARD_PAGE.to_string())
        }
    }

    fn options(max_pages: u32) -> ScrapeOptions {
        ScrapeOptions {
            max_pages,
            max_retries: 3,
            retry_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            debug_html_path: None,
        }
    }

    #[tokio::test]
    async fn test_collects_cards_from_every_page() {
        let fetcher = ScriptedFetcher::new(&[]);
        let result = scrape_all_pages(&fetcher, &options(3)).await;

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.pages_fetched, 3);
        assert!(result.failed_pages.is_empty());
        assert_eq!(*fetcher.calls.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(result.records[0].title.as_deref(), Some("Pants 7"));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let fetcher = ScriptedFetcher::new(&[(2, 2)]);
        let result = scrape_all_pages(&fetcher, &options(2)).await;

        assert_eq!(result.records.len(), 2);
        assert_eq!(*fetcher.calls.lock().unwrap(), vec![1, 2, 2, 2]);
    }

    #[tokio::test]
    async fn test_skips_page_after_retries_are_exhausted() {
        let fetcher = ScriptedFetcher::new(&[(2, 10)]);
        let result = scrape_all_pages(&fetcher, &options(3)).await;

        assert_eq!(result.failed_pages, vec![2]);
        assert_eq!(result.pages_fetched, 2);
        assert_eq!(result.records.len(), 2);
        // first attempt plus three retries
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|p| **p == 2).count(), 4);
    }

    #[tokio::test]
    async fn test_writes_debug_html_for_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug_page_1.html");
        let fetcher = ScriptedFetcher::new(&[]);
        let mut opts = options(1);
        opts.debug_html_path = Some(path.clone());

        scrape_all_pages(&fetcher, &opts).await;

        let dumped = std::fs::read_to_string(path).unwrap();
        assert!(dumped.contains("Pants 7"));
    }
}
