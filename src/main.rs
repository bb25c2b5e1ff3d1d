use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::error;

use catalog_etl::config::{Config, DEFAULT_CONFIG_PATH};
use catalog_etl::logging;
use catalog_etl::pipeline::Pipeline;
use catalog_etl::sinks::csv_file;

#[derive(Parser)]
#[command(name = "catalog_etl")]
#[command(about = "Fashion Studio catalog ETL: scrape, clean and load product listings")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file; defaults are used when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the number of catalog pages to crawl
    #[arg(long, global = true)]
    max_pages: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, transform and load (the default)
    Run,
    /// Scrape the catalog and write the raw snapshot only
    Extract,
    /// Clean a raw snapshot and write the CSV output
    Transform {
        /// Raw snapshot to read (defaults to the configured snapshot path)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Load an already cleaned CSV into every sink
    Load {
        /// Cleaned CSV to read (defaults to the configured output path)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(max_pages) = cli.max_pages {
        config.source.max_pages = max_pages;
    }
    let _log_guard = logging::init_logging(&config.logging.directory);

    let pipeline = Pipeline::new(config);
    execute(&pipeline, cli.command.unwrap_or(Commands::Run)).await
}

/// Run one command. A failed stage is printed and returned so the process exits non-zero.
async fn execute(pipeline: &Pipeline, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run => match pipeline.run().await {
            Ok(result) => {
                println!("\n📊 Pipeline Results:");
                println!("   Scraped: {}", result.scraped);
                println!("   Cleaned: {}", result.normalize.output);
                println!("   Skipped pages: {}", result.failed_pages.len());
                println!("   Failed sinks: {}", result.load.failures());
            }
            Err(e) => {
                error!("Pipeline failed: {}", e);
                println!("❌ Pipeline failed: {}", e);
                bail!("pipeline failed: {}", e);
            }
        },
        Commands::Extract => {
            if let Err(e) = pipeline.extract().await {
                error!("Extract failed: {}", e);
                println!("❌ Failed to extract data: {}", e);
                bail!("extract failed: {}", e);
            }
        }
        Commands::Transform { input } => {
            let input = input.unwrap_or_else(|| pipeline.config().source.raw_snapshot_path.clone());
            match pipeline.transform_snapshot(&input) {
                Ok((records, _)) => {
                    let output = &pipeline.config().output.csv_path;
                    csv_file::write_products(output, &records)?;
                    println!("✅ Saved to {}", output.display());
                }
                Err(e) => {
                    error!("Transform failed: {}", e);
                    println!("❌ Failed to transform data: {}", e);
                    bail!("transform failed: {}", e);
                }
            }
        }
        Commands::Load { input } => {
            let input = input.unwrap_or_else(|| pipeline.config().output.csv_path.clone());
            match csv_file::read_products(&input) {
                Ok(records) => {
                    let report = pipeline.load(&records).await;
                    println!("   Failed sinks: {}", report.failures());
                }
                Err(e) => {
                    error!("Could not read {}: {}", input.display(), e);
                    println!("❌ Could not read {}: {}", input.display(), e);
                    bail!("could not read {}: {}", input.display(), e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_in(dir: &std::path::Path) -> Pipeline {
        let mut config = Config::default();
        config.output.csv_path = dir.join("products.csv");
        config.spreadsheet.enabled = false;
        config.database.enabled = false;
        Pipeline::new(config)
    }

    #[tokio::test]
    async fn test_failed_transform_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());
        let input = dir.path().join("raw_products.csv");
        std::fs::write(&input, "Title,Price\nShirt,$1.00\n").unwrap();

        let result = execute(&pipeline, Commands::Transform { input: Some(input) }).await;

        assert!(result.is_err());
        assert!(!dir.path().join("products.csv").exists());
    }

    #[tokio::test]
    async fn test_failed_load_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());

        let result = execute(
            &pipeline,
            Commands::Load {
                input: Some(dir.path().join("missing.csv")),
            },
        )
        .await;

        assert!(result.is_err());
    }
}
