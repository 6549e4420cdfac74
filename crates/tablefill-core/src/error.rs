use thiserror::Error;

use crate::task::SourceKind;

/// Configuration errors detected before any row is generated.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Column metadata does not match the shape its source kind requires.
    #[error("table '{table}', column '{column}': invalid {kind} metadata ({detail}); expected {expected}")]
    MetadataMismatch {
        table: String,
        column: String,
        kind: SourceKind,
        detail: String,
        expected: &'static str,
    },
    /// The source kind exists in the contract but has no implementation.
    #[error("table '{table}', column '{column}': source kind '{kind}' is not implemented")]
    Unimplemented {
        table: String,
        column: String,
        kind: SourceKind,
    },
    /// An AI column was declared but no backend is available to the worker.
    #[error("table '{table}', column '{column}': no AI backend configured")]
    MissingBackend { table: String, column: String },
    #[error("unknown faker locale '{0}' (supported: en_US, pt_BR)")]
    UnknownLocale(String),
    #[error("unknown dbms dialect '{0}'")]
    UnknownDialect(String),
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
