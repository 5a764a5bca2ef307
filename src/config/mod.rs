mod file_config;

pub use file_config::{FileConfig, LoadConfig, SourcesConfig};

use crate::extract::SourceFiles;
use crate::load::{KeyRemapPolicy, LoadOptions};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "spotify_warehouse.db";
pub const DEFAULT_SPOTIFY_DATA_CLEAN: &str = "spotify_data_clean.csv";
pub const DEFAULT_TRACK_DATA_FINAL: &str = "track_data_final.csv";

/// CLI arguments that can be used for config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub spotify_data_clean: Option<PathBuf>,
    pub track_data_final: Option<PathBuf>,
    pub no_full_refresh: bool,
    pub strict_key_remap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub sources: SourceFiles,
    pub load: LoadOptions,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Self {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let sources_file = file.sources.unwrap_or_default();
        let sources = SourceFiles {
            contemporary: sources_file
                .spotify_data_clean
                .or_else(|| cli.spotify_data_clean.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOTIFY_DATA_CLEAN)),
            historic: sources_file
                .track_data_final
                .or_else(|| cli.track_data_final.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACK_DATA_FINAL)),
        };

        let load_file = file.load.unwrap_or_default();
        let strict = load_file.strict_key_remap.unwrap_or(cli.strict_key_remap);
        let load = LoadOptions {
            clear_existing: load_file.full_refresh.unwrap_or(!cli.no_full_refresh),
            key_remap: if strict {
                KeyRemapPolicy::Strict
            } else {
                KeyRemapPolicy::PassThrough
            },
        };

        Self {
            db_path,
            sources,
            load,
        }
    }
}
