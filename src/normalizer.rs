//! Turns scraped catalog text into typed product records.
//!
//! Every stage runs over the whole surviving batch before the next one starts,
//! so the first error reported under [`ParseFailurePolicy::Abort`] is always
//! the first bad rating, then the first bad colour count.

use std::collections::HashSet;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::types::{NormalizedRecord, RawRecord};

static RATING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+").expect("valid rating regex"));
static COLORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid colors regex"));

/// What to do with a row whose rating or colour count cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Fail the whole batch on the first unparseable value
    #[default]
    Abort,
    /// Drop the offending row and keep going
    SkipRow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Multiplier from the catalog currency to the reporting currency
    pub exchange_rate: f64,
    pub on_parse_error: ParseFailurePolicy,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            on_parse_error: ParseFailurePolicy::Abort,
        }
    }
}

/// Row counts for one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub input: usize,
    pub sentinel: usize,
    pub missing: usize,
    pub duplicate: usize,
    pub bad_price: usize,
    pub bad_rating: usize,
    pub bad_colors: usize,
    pub output: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.input - self.output
    }
}

/// Fail with the first required column missing from `headers`
pub fn check_schema<S: AsRef<str>>(headers: &[S]) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.as_ref() == column) {
            return Err(EtlError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Intermediate row once the price has been converted
struct Priced<'a> {
    raw: &'a RawRecord,
    price: f64,
}

/// Intermediate row once the rating has been parsed
struct Rated<'a> {
    raw: &'a RawRecord,
    price: f64,
    rating: f64,
}

pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a raw table that came with a header row.
    pub fn normalize_table<S: AsRef<str>>(
        &self,
        headers: &[S],
        records: &[RawRecord],
    ) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
        check_schema(headers)?;
        let has_timestamp = headers.iter().any(|h| h.as_ref() == COL_TIMESTAMP);
        self.run(records, has_timestamp)
    }

    /// Normalize records produced in-process, where every column is known to exist.
    pub fn normalize(&self, records: &[RawRecord]) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
        self.run(records, true)
    }

    #[instrument(skip_all, fields(records = records.len()))]
    fn run(
        &self,
        records: &[RawRecord],
        has_timestamp: bool,
    ) -> Result<(Vec<NormalizedRecord>, NormalizeReport)> {
        let mut report = NormalizeReport {
            input: records.len(),
            ..NormalizeReport::default()
        };

        // 1. Placeholder rows
        let rows: Vec<&RawRecord> = records.iter().filter(|r| !is_sentinel(r)).collect();
        report.sentinel = records.len() - rows.len();

        // 2. Missing values
        let before = rows.len();
        let rows: Vec<&RawRecord> = rows
            .into_iter()
            .filter(|r| is_complete(r, has_timestamp))
            .collect();
        report.missing = before - rows.len();

        // 3. Exact duplicates, first one wins
        let before = rows.len();
        let mut seen = HashSet::with_capacity(rows.len());
        let rows: Vec<&RawRecord> = rows.into_iter().filter(|r| seen.insert(*r)).collect();
        report.duplicate = before - rows.len();

        // 4. Price
        let before = rows.len();
        let priced: Vec<Priced> = rows
            .into_iter()
            .filter_map(|raw| {
                let price = parse_price(field(&raw.price))?;
                Some(Priced {
                    raw,
                    price: price * self.config.exchange_rate,
                })
            })
            .collect();
        report.bad_price = before - priced.len();

        // 5. Rating
        let before = priced.len();
        let mut rated = Vec::with_capacity(priced.len());
        for row in priced {
            match parse_rating(field(&row.raw.rating)) {
                Ok(rating) => rated.push(Rated {
                    raw: row.raw,
                    price: row.price,
                    rating,
                }),
                Err(e) => self.reject(e)?,
            }
        }
        report.bad_rating = before - rated.len();

        // 6..9. Colors, size, gender and the final typed record
        let before = rated.len();
        let mut output = Vec::with_capacity(rated.len());
        for row in rated {
            let colors = match parse_colors(field(&row.raw.colors)) {
                Ok(colors) => colors,
                Err(e) => {
                    self.reject(e)?;
                    continue;
                }
            };
            output.push(NormalizedRecord {
                title: field(&row.raw.title).to_string(),
                price: row.price,
                rating: row.rating,
                colors,
                size: strip_label(field(&row.raw.size), SIZE_PREFIX),
                gender: strip_label(field(&row.raw.gender), GENDER_PREFIX),
                timestamp: row.raw.timestamp.clone(),
            });
        }
        report.bad_colors = before - output.len();
        report.output = output.len();

        record_metrics(&report);
        info!(
            input = report.input,
            output = report.output,
            sentinel = report.sentinel,
            missing = report.missing,
            duplicate = report.duplicate,
            bad_price = report.bad_price,
            "Normalized catalog records"
        );

        Ok((output, report))
    }

    fn reject(&self, error: EtlError) -> Result<()> {
        match self.config.on_parse_error {
            ParseFailurePolicy::Abort => Err(error),
            ParseFailurePolicy::SkipRow => {
                warn!("Dropping row: {}", error);
                Ok(())
            }
        }
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn matches_sentinel(value: &Option<String>, sentinel: &str) -> bool {
    value
        .as_deref()
        .map(|v| v.to_lowercase() == sentinel.to_lowercase())
        .unwrap_or(false)
}

fn is_sentinel(record: &RawRecord) -> bool {
    matches_sentinel(&record.title, UNKNOWN_TITLE)
        || matches_sentinel(&record.price, PRICE_UNAVAILABLE)
        || matches_sentinel(&record.rating, INVALID_RATING)
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn is_complete(record: &RawRecord, has_timestamp: bool) -> bool {
    record.required_fields().iter().all(|v| is_present(v))
        && (!has_timestamp || is_present(&record.timestamp))
}

/// Keep digits and dots, then read what is left as a number.
/// `None` means the row is dropped.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(price) => Some(price),
        Err(_) => {
            debug!("Unparseable price {:?} after cleanup", cleaned);
            None
        }
    }
}

pub fn parse_rating(text: &str) -> Result<f64> {
    RATING_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| EtlError::Parse {
            column: COL_RATING,
            value: text.to_string(),
        })
}

pub fn parse_colors(text: &str) -> Result<i64> {
    COLORS_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .ok_or_else(|| EtlError::Parse {
            column: COL_COLORS,
            value: text.to_string(),
        })
}

/// Remove every occurrence of `label` and trim the rest
pub fn strip_label(text: &str, label: &str) -> String {
    text.replace(label, "").trim().to_string()
}

fn record_metrics(report: &NormalizeReport) {
    counter!("catalog_etl_records_in_total").increment(report.input as u64);
    counter!("catalog_etl_records_out_total").increment(report.output as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "sentinel").increment(report.sentinel as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "missing").increment(report.missing as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "duplicate").increment(report.duplicate as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "price").increment(report.bad_price as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "rating").increment(report.bad_rating as u64);
    counter!("catalog_etl_records_dropped_total", "reason" => "colors").increment(report.bad_colors as u64);
}
