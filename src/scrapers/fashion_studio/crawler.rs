use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::info;

use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use crate::types::PageFetcher;

/// HTTP session against the Fashion Studio catalog
pub struct FashionStudioCrawler {
    client: Client,
    base_url: String,
}

impl FashionStudioCrawler {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| EtlError::Config(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Page 1 lives at the site root, every other page at `/page<n>`
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.base_url.clone()
        } else {
            format!("{}/page{}", self.base_url, page)
        }
    }
}

#[async_trait]
impl PageFetcher for FashionStudioCrawler {
    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.page_url(page);
        info!("Attempting to fetch: {}", url);

        let fetch_error = |e: reqwest::Error| EtlError::Fetch {
            page,
            message: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Fetch {
                page,
                message: format!("request failed with status: {}", status),
            });
        }

        let text = response.text().await.map_err(fetch_error)?;
        info!("Successfully fetched page {}, status code: {}", page, status.as_u16());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_urls() {
        let config = SourceConfig {
            base_url: "https://fashion-studio.dicoding.dev/".to_string(),
            ..SourceConfig::default()
        };
        let crawler = FashionStudioCrawler::new(&config).unwrap();
        assert_eq!(crawler.page_url(1), "https://fashion-studio.dicoding.dev");
        assert_eq!(crawler.page_url(2), "https://fashion-studio.dicoding.dev/page2");
        assert_eq!(crawler.page_url(50), "https://fashion-studio.dicoding.dev/page50");
    }

    #[test]
    fn test_rejects_invalid_user_agent() {
        let config = SourceConfig {
            user_agent: "bad\nagent".to_string(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            FashionStudioCrawler::new(&config),
            Err(EtlError::Config(_))
        ));
    }
}
