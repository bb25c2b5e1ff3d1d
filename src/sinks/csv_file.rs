use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::constants::OUTPUT_COLUMNS;
use crate::error::Result;
use crate::normalizer::check_schema;
use crate::types::{format_decimal, NormalizedRecord, RawRecord};

/// Write the normalized table with its header row
pub fn write_products(path: &Path, records: &[NormalizedRecord]) -> Result<PathBuf> {
    ensure_parent(path)?;
    let file = fs::File::create(path)?;
    write_products_to(file, records)?;
    info!("Saved {} products to {}", records.len(), path.display());
    info!("Columns written: {:?}", OUTPUT_COLUMNS);
    Ok(path.to_path_buf())
}

pub fn write_products_to<W: Write>(writer: W, records: &[NormalizedRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        let price = format_decimal(record.price);
        let rating = format_decimal(record.rating);
        let colors = record.colors.to_string();
        wtr.write_record([
            record.title.as_str(),
            price.as_str(),
            rating.as_str(),
            colors.as_str(),
            record.size.as_str(),
            record.gender.as_str(),
            record.timestamp.as_deref().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a table written by [`write_products`]
pub fn read_products(path: &Path) -> Result<Vec<NormalizedRecord>> {
    read_products_from(fs::File::open(path)?)
}

pub fn read_products_from<R: Read>(reader: R) -> Result<Vec<NormalizedRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Snapshot of the raw scrape, kept so a run can be re-transformed later
pub fn write_raw_snapshot(path: &Path, records: &[RawRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        let fields = [
            &record.title,
            &record.price,
            &record.rating,
            &record.colors,
            &record.size,
            &record.gender,
            &record.timestamp,
        ];
        wtr.write_record(fields.iter().map(|f| f.as_deref().unwrap_or_default()))?;
    }
    wtr.flush()?;
    info!("Raw data saved to {} ({} rows)", path.display(), records.len());
    Ok(())
}

/// Header row plus records of a raw snapshot. Empty cells come back as missing values.
///
/// The header is checked for every required column before any row is read.
pub fn read_raw_snapshot(path: &Path) -> Result<(Vec<String>, Vec<RawRecord>)> {
    read_raw_snapshot_from(fs::File::open(path)?)
}

pub fn read_raw_snapshot_from<R: Read>(reader: R) -> Result<(Vec<String>, Vec<RawRecord>)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    check_schema(&headers)?;
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok((headers, records))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
