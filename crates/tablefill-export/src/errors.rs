use thiserror::Error;

use tablefill_core::ConfigError;
use tablefill_generate::GenerationError;

/// Errors emitted by the export worker and the archive consolidator.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid archive manifest: {0}")]
    InvalidManifest(String),
}
