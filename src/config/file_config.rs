use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,

    pub sources: Option<SourcesConfig>,
    pub load: Option<LoadConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    /// Contemporary export, durations in minutes.
    pub spotify_data_clean: Option<PathBuf>,
    /// Historic export, durations in milliseconds.
    pub track_data_final: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LoadConfig {
    pub full_refresh: Option<bool>,
    pub strict_key_remap: Option<bool>,
}

impl FileConfig {
    /// Reads a TOML config file. Relative paths in it are taken relative to the file's
    /// own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        if let Some(base_dir) = path.parent() {
            config.rebase_paths(base_dir);
        }
        Ok(config)
    }

    fn rebase_paths(&mut self, base_dir: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p {
                if path.is_relative() {
                    *path = base_dir.join(&*path);
                }
            }
        };
        rebase(&mut self.db_path);
        if let Some(sources) = &mut self.sources {
            rebase(&mut sources.spotify_data_clean);
            rebase(&mut sources.track_data_final);
        }
    }
}
