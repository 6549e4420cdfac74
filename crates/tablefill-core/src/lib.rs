//! Core contracts for tablefill.
//!
//! Defines the task descriptor handed to an export worker, the typed column
//! sources decoded from it, DBMS dialect lookup and SQL quoting helpers shared
//! by the generation and export crates.

pub mod dialect;
pub mod error;
pub mod schema;
pub mod source;
pub mod sql;
pub mod task;

pub use dialect::Dialect;
pub use error::{ConfigError, ConfigResult};
pub use schema::task_json_schema;
pub use source::{
    AiSource, ColumnSource, ExhaustPolicy, FakerLocale, FakerSource, FileColumn, FileSource,
    FixedSource,
};
pub use sql::{escape_literal, quote_identifier, unescape_literal};
pub use task::{ColumnSpec, SourceKind, TableSpec, TaskDescriptor, file_stem_problem};
