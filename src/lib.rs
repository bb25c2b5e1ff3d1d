pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod scrapers;
pub mod sinks;
pub mod types;
