use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tablefill_export::{DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL, WorkerOptions};
use tablefill_generate::DEFAULT_AI_CHUNK_SIZE;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Generation service URL; AI columns fail without one.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub chunk_size: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
            chunk_size: DEFAULT_AI_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub batch_size: usize,
    pub progress_interval: u64,
    pub settle_before_sync_ms: u64,
    pub settle_after_sync_ms: u64,
    pub ai: AiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out/sql"),
            archive_dir: PathBuf::from("out/archives"),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            settle_before_sync_ms: 250,
            settle_after_sync_ms: 250,
            ai: AiSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults when no path is given; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            output_dir: self.output_dir.clone(),
            batch_size: self.batch_size,
            progress_interval: self.progress_interval,
            settle_before_sync: Duration::from_millis(self.settle_before_sync_ms),
            settle_after_sync: Duration::from_millis(self.settle_after_sync_ms),
            ai_chunk_size: self.ai.chunk_size,
        }
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai.timeout_secs)
    }
}
