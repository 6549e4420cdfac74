//! Column value streams and row assembly for tablefill.
//!
//! Each column of a table is backed by one [`ColumnStream`]; the
//! [`RowAssembler`] advances them in lock-step to build SQL-ready rows.

pub mod ai;
pub mod assembler;
pub mod errors;
pub mod faker;
pub mod file;
pub mod stream;

pub use ai::{AiBackend, AiError, AiRequest, HttpAiBackend};
pub use assembler::{Row, RowAssembler};
pub use errors::GenerationError;
pub use stream::{ColumnStream, DEFAULT_AI_CHUNK_SIZE, StreamContext};
