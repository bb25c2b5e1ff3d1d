use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::normalizer::{NormalizeReport, Normalizer};
use crate::scrapers::fashion_studio::FashionStudioCrawler;
use crate::scrapers::{scrape_all_pages, ScrapeOptions};
use crate::sinks::{csv_file, DatabaseSink, SpreadsheetSink};
use crate::types::{NormalizedRecord, PageFetcher, RawRecord};

/// Outcome of a single sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SinkStatus {
    /// Written; carries the path, URL or row count
    Written(String),
    Disabled,
    Failed(String),
}

impl SinkStatus {
    fn from_result<T: fmt::Display>(sink: &str, result: Result<T>) -> Self {
        match result {
            Ok(detail) => SinkStatus::Written(detail.to_string()),
            Err(e) => {
                error!("Failed to save to {}: {}", sink, e);
                SinkStatus::Failed(e.to_string())
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SinkStatus::Failed(_))
    }
}

/// Result of the load stage
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub file: SinkStatus,
    pub spreadsheet: SinkStatus,
    pub database: SinkStatus,
}

impl LoadReport {
    pub fn failures(&self) -> usize {
        [&self.file, &self.spreadsheet, &self.database]
            .iter()
            .filter(|s| s.is_failed())
            .count()
    }
}

/// Result of a complete extract → transform → load run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub scraped: usize,
    pub failed_pages: Vec<u32>,
    pub normalize: NormalizeReport,
    pub load: LoadReport,
}

pub struct Pipeline {
    config: Config,
    normalizer: Normalizer,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let normalizer = Normalizer::new(config.normalizer.to_normalizer_config());
        Self { config, normalizer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawl the live catalog
    pub async fn extract(&self) -> Result<(Vec<RawRecord>, Vec<u32>)> {
        let crawler = FashionStudioCrawler::new(&self.config.source)?;
        self.extract_with(&crawler).await
    }

    /// Crawl through `fetcher` and keep a raw snapshot on disk
    #[instrument(skip_all)]
    pub async fn extract_with(&self, fetcher: &dyn PageFetcher) -> Result<(Vec<RawRecord>, Vec<u32>)> {
        println!("\n📡 Extracting catalog pages...");
        let options = ScrapeOptions::from(&self.config.source);
        let scraped = scrape_all_pages(fetcher, &options).await;

        let snapshot = &self.config.source.raw_snapshot_path;
        csv_file::write_raw_snapshot(snapshot, &scraped.records)?;
        println!(
            "✅ Raw data saved to {} (total {} rows)",
            snapshot.display(),
            scraped.records.len()
        );
        if !scraped.failed_pages.is_empty() {
            println!("⚠️  Skipped pages: {:?}", scraped.failed_pages);
        }
        Ok((scraped.records, scraped.failed_pages))
    }

    pub fn transform(&self, records: &[RawRecord]) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
        println!("\n🔧 Transforming...");
        let (normalized, report) = self.normalizer.normalize(records)?;
        Self::print_transform(&report);
        Ok((normalized, report))
    }

    /// Transform a raw snapshot from disk; the header is checked before any row is read
    pub fn transform_snapshot(&self, path: &Path) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
        println!("\n🔧 Transforming {}...", path.display());
        let (headers, records) = csv_file::read_raw_snapshot(path)?;
        let (normalized, report) = self.normalizer.normalize_table(&headers, &records)?;
        Self::print_transform(&report);
        Ok((normalized, report))
    }

    fn print_transform(report: &NormalizeReport) {
        println!(
            "✅ Cleaned {} rows ({} dropped of {})",
            report.output,
            report.dropped(),
            report.input
        );
    }

    /// Write to every enabled sink. Sink failures are reported, never raised.
    #[instrument(skip_all, fields(rows = records.len()))]
    pub async fn load(&self, records: &[NormalizedRecord]) -> LoadReport {
        println!("\n💾 Loading...");

        let file = SinkStatus::from_result(
            "CSV",
            csv_file::write_products(&self.config.output.csv_path, records)
                .map(|path| path.display().to_string()),
        );
        if let SinkStatus::Written(path) = &file {
            println!("✅ Saved to {}", path);
        }

        let spreadsheet = if self.config.spreadsheet.enabled {
            let status = SinkStatus::from_result("Google Sheets", self.load_spreadsheet(records).await);
            match &status {
                SinkStatus::Written(url) => println!("✅ Google Sheets URL: {}", url),
                _ => println!("❌ Failed to save to Google Sheets"),
            }
            status
        } else {
            SinkStatus::Disabled
        };

        let database = if self.config.database.enabled {
            let status = SinkStatus::from_result("database", self.load_database(records).await);
            match &status {
                SinkStatus::Written(rows) => println!("✅ Saved {} rows to the database", rows),
                _ => println!("❌ Failed to save to the database"),
            }
            status
        } else {
            SinkStatus::Disabled
        };

        let report = LoadReport {
            file,
            spreadsheet,
            database,
        };
        if report.failures() > 0 {
            warn!("{} sink(s) failed", report.failures());
        }
        report
    }

    async fn load_spreadsheet(&self, records: &[NormalizedRecord]) -> Result<String> {
        let sink = SpreadsheetSink::from_key_file(&self.config.spreadsheet.credentials_path)?;
        sink.upload(&self.config.spreadsheet.title, records).await
    }

    async fn load_database(&self, records: &[NormalizedRecord]) -> Result<u64> {
        let sink = DatabaseSink::new(self.config.database.connection_url()?)?;
        sink.replace_products(records).await
    }

    /// Run all three stages against the live catalog
    pub async fn run(&self) -> Result<PipelineResult> {
        let crawler = FashionStudioCrawler::new(&self.config.source)?;
        self.run_with(&crawler).await
    }

    /// Run all three stages; a failing stage stops the ones after it
    pub async fn run_with(&self, fetcher: &dyn PageFetcher) -> Result<PipelineResult> {
        info!("🚀 Starting ETL pipeline");
        println!("🚀 Starting ETL pipeline...");

        let (raw, failed_pages) = self.extract_with(fetcher).await?;
        let (normalized, normalize) = self.transform(&raw)?;
        let load = self.load(&normalized).await;

        println!("\n🏁 ETL pipeline finished");
        Ok(PipelineResult {
            scraped: raw.len(),
            failed_pages,
            normalize,
            load,
        })
    }
}
