use thiserror::Error;

use tablefill_core::ConfigError;

use crate::ai::AiError;

/// Errors raised while building or drawing from column streams.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("column '{column}': unknown faker rule '{rule}'")]
    UnknownRule { column: String, rule: String },
    #[error("column '{column}': ai backend failed: {source}")]
    Ai {
        column: String,
        #[source]
        source: AiError,
    },
    #[error("column '{column}': csv error: {source}")]
    Csv {
        column: String,
        #[source]
        source: csv::Error,
    },
    #[error("column '{column}': {message}")]
    Source { column: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Column the failure is attributed to, when there is one.
    pub fn column(&self) -> Option<&str> {
        match self {
            GenerationError::UnknownRule { column, .. }
            | GenerationError::Ai { column, .. }
            | GenerationError::Csv { column, .. }
            | GenerationError::Source { column, .. } => Some(column.as_str()),
            GenerationError::Config(_) | GenerationError::Io(_) => None,
        }
    }

    /// True for failures detected before any row was produced.
    pub fn is_configuration(&self) -> bool {
        matches!(self, GenerationError::Config(_))
    }
}
