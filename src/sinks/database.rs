use chrono::Local;
use metrics::counter;
use sqlx::any::install_default_drivers;
use sqlx::AnyConnection;
use sqlx::Connection;
use tracing::{info, instrument, warn};

use crate::constants::DB_TIMESTAMP_FORMAT;
use crate::error::{EtlError, Result};
use crate::types::NormalizedRecord;

/// SQL flavour of the target database, picked from the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(EtlError::Config(format!(
                "Unsupported database URL scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    fn create_table(self) -> &'static str {
        match self {
            Dialect::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id SERIAL PRIMARY KEY,
                    title TEXT,
                    price FLOAT,
                    rating FLOAT,
                    colors INTEGER,
                    size TEXT,
                    gender TEXT,
                    timestamp TEXT
                )
                "#
            }
            Dialect::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT,
                    price FLOAT,
                    rating FLOAT,
                    colors INTEGER,
                    size TEXT,
                    gender TEXT,
                    timestamp TEXT
                )
                "#
            }
        }
    }

    /// Statements that empty the table and restart the id sequence
    fn clear_table(self) -> &'static [&'static str] {
        match self {
            Dialect::Postgres => &["TRUNCATE TABLE products RESTART IDENTITY"],
            Dialect::Sqlite => &[
                "DELETE FROM products",
                "DELETE FROM sqlite_sequence WHERE name = 'products'",
            ],
        }
    }
}

const INSERT_PRODUCT: &str = "INSERT INTO products (title, price, rating, colors, size, gender, timestamp) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

/// Replaces the contents of the `products` table with each batch it is given
pub struct DatabaseSink {
    url: String,
    dialect: Dialect,
}

impl DatabaseSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let dialect = Dialect::from_url(&url)?;
        Ok(Self { url, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create the table if needed, drop whatever it held and insert `records`,
    /// all in one transaction. Returns the number of rows written.
    ///
    /// The connection is opened here and closed before returning, on success
    /// and on failure alike.
    #[instrument(skip_all, fields(rows = records.len()))]
    pub async fn replace_products(&self, records: &[NormalizedRecord]) -> Result<u64> {
        install_default_drivers();
        let mut conn = AnyConnection::connect(&self.url).await?;

        let result = self.write_batch(&mut conn, records).await;

        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        }

        let written = result?;
        counter!("catalog_etl_db_rows_written_total").increment(written);
        info!("Saved {} rows to the products table", written);
        Ok(written)
    }

    async fn write_batch(&self, conn: &mut AnyConnection, records: &[NormalizedRecord]) -> Result<u64> {
        let mut tx = conn.begin().await?;

        sqlx::query(self.dialect.create_table()).execute(&mut *tx).await?;
        for statement in self.dialect.clear_table() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        let mut written = 0;
        for record in records {
            let timestamp = record
                .timestamp
                .clone()
                .unwrap_or_else(|| Local::now().format(DB_TIMESTAMP_FORMAT).to_string());

            sqlx::query(INSERT_PRODUCT)
                .bind(record.title.clone())
                .bind(record.price)
                .bind(record.rating)
                .bind(record.colors)
                .bind(record.size.clone())
                .bind(record.gender.clone())
                .bind(timestamp)
                .execute(&mut *tx)
                .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }
}
