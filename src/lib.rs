//! Spotify star-schema warehouse.
//!
//! Reads the two Spotify CSV exports, builds conformed artist, album, track and date
//! dimensions plus a track fact table, and loads them into SQLite in one transaction.
//! A small set of read-only reports runs over the loaded warehouse.

pub mod cli_style;
pub mod config;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod reports;
pub mod sqlite_persistence;
pub mod transform;
pub mod warehouse;

pub use extract::{extract_records, RawRecord, SourceFiles};
pub use load::{load_warehouse, KeyRemapPolicy, LoadError, LoadOptions};
pub use pipeline::{run_etl, EtlSummary};
pub use transform::{transform, TransformResult};
