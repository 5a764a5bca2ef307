//! CSV fixture creation

use super::constants::*;
use chrono::{NaiveDate, NaiveDateTime};
use spotify_warehouse::SourceFiles;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two source exports and a warehouse path inside one temporary directory.
pub struct TestSources {
    // Held so the directory outlives the test.
    _dir: TempDir,
    pub sources: SourceFiles,
    pub db_path: PathBuf,
}

impl TestSources {
    /// Writes the given data rows under the standard headers.
    pub fn with_rows(contemporary: &[&str], historic: &[&str]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let sources = SourceFiles {
            contemporary: dir.path().join("spotify_data_clean.csv"),
            historic: dir.path().join("track_data_final.csv"),
        };
        write_csv(&sources.contemporary, CONTEMPORARY_HEADER, contemporary);
        write_csv(&sources.historic, HISTORIC_HEADER, historic);
        let db_path = dir.path().join("warehouse.db");
        TestSources {
            _dir: dir,
            sources,
            db_path,
        }
    }

    /// The nine-row fixture described in `constants`.
    pub fn standard() -> Self {
        Self::with_rows(STANDARD_CONTEMPORARY_ROWS, STANDARD_HISTORIC_ROWS)
    }
}

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(path, content).expect("Failed to write CSV fixture");
}

pub fn fixed_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap()
}
