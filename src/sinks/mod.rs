//! Persistence targets for the normalized table. Each sink is independent:
//! one failing never rolls back or blocks another.

pub mod csv_file;
pub mod database;
pub mod spreadsheet;

pub use database::DatabaseSink;
pub use spreadsheet::SpreadsheetSink;
