//! Extract stage: reads both source exports into one list of [`RawRecord`]s.

mod raw;
mod reader;

pub use raw::RawRecord;
pub use reader::{
    minutes_to_ms, parse_explicit, parse_float, parse_integer, read_records_from, CsvDialect,
};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Locations of the two source exports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFiles {
    /// `spotify_data_clean.csv`
    pub contemporary: PathBuf,
    /// `track_data_final.csv`
    pub historic: PathBuf,
}

impl SourceFiles {
    /// Source files that do not exist, in contemporary, historic order.
    pub fn missing(&self) -> Vec<&Path> {
        [self.contemporary.as_path(), self.historic.as_path()]
            .into_iter()
            .filter(|p| !p.is_file())
            .collect()
    }
}

/// Reads one file in the given dialect.
pub fn read_records(path: &Path, dialect: CsvDialect) -> Result<Vec<RawRecord>, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_records_from(BufReader::new(file), dialect).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the contemporary file, then the historic one, and concatenates them in that order.
pub fn extract_records(sources: &SourceFiles) -> Result<Vec<RawRecord>, ExtractError> {
    let mut records = read_records(&sources.contemporary, CsvDialect::Contemporary)?;
    info!(
        "Read {} records from {:?} ({})",
        records.len(),
        sources.contemporary,
        CsvDialect::Contemporary
    );

    let historic = read_records(&sources.historic, CsvDialect::Historic)?;
    info!(
        "Read {} records from {:?} ({})",
        historic.len(),
        sources.historic,
        CsvDialect::Historic
    );

    records.extend(historic);
    info!("Extracted {} records in total", records.len());
    Ok(records)
}
