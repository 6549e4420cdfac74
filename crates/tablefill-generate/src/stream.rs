use std::collections::VecDeque;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use tablefill_core::{AiSource, ColumnSource, ColumnSpec, ConfigError, FakerLocale, FakerSource};

use crate::ai::{AiBackend, AiRequest};
use crate::errors::GenerationError;
use crate::faker;
use crate::file::FileStream;

pub const DEFAULT_AI_CHUNK_SIZE: usize = 50;

/// Shared inputs for opening the streams of one table.
#[derive(Clone)]
pub struct StreamContext<'a> {
    pub table: &'a str,
    pub seed: u64,
    pub ai_backend: Option<Arc<dyn AiBackend>>,
    pub default_chunk_size: usize,
}

impl<'a> StreamContext<'a> {
    pub fn new(table: &'a str, seed: u64) -> Self {
        Self {
            table,
            seed,
            ai_backend: None,
            default_chunk_size: DEFAULT_AI_CHUNK_SIZE,
        }
    }

    pub fn with_ai_backend(mut self, backend: Arc<dyn AiBackend>) -> Self {
        self.ai_backend = Some(backend);
        self
    }
}

/// Finite, non-restartable sequence of values for one column.
///
/// At most `record_count` values are drawn; later draws yield `None`.
pub struct ColumnStream {
    column: String,
    remaining: u64,
    source: StreamSource,
}

enum StreamSource {
    Faker(FakerStream),
    Ai(AiStream),
    File(FileStream),
    Fixed(String),
}

impl ColumnStream {
    /// Decode the column's metadata and open its stream.
    pub fn open(
        spec: &ColumnSpec,
        record_count: u64,
        ctx: &StreamContext<'_>,
    ) -> Result<Self, GenerationError> {
        let source = spec.resolve_source(ctx.table)?;
        Self::from_source(&spec.name, source, record_count, ctx)
    }

    pub fn from_source(
        column: &str,
        source: ColumnSource,
        record_count: u64,
        ctx: &StreamContext<'_>,
    ) -> Result<Self, GenerationError> {
        debug!(table = ctx.table, column, kind = %source.kind(), "opening column stream");
        let source = match source {
            ColumnSource::Faker(faker) => {
                let seed = hash_seed(ctx.seed, &format!("{}.{}", ctx.table, column));
                StreamSource::Faker(FakerStream::new(faker, seed))
            }
            ColumnSource::Ai(ai) => {
                let backend =
                    ctx.ai_backend
                        .clone()
                        .ok_or_else(|| ConfigError::MissingBackend {
                            table: ctx.table.to_string(),
                            column: column.to_string(),
                        })?;
                StreamSource::Ai(AiStream::new(ai, ctx.table, backend, ctx.default_chunk_size))
            }
            ColumnSource::File(file) => {
                StreamSource::File(FileStream::open(ctx.table, column, file)?)
            }
            ColumnSource::Fixed(fixed) => StreamSource::Fixed(fixed.value),
        };

        Ok(Self {
            column: column.to_string(),
            remaining: record_count,
            source,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Draw the value for the next row; `None` means the column has no value.
    pub fn next_value(&mut self) -> Result<Option<String>, GenerationError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let value = match &mut self.source {
            StreamSource::Faker(stream) => Some(stream.next_value(&self.column)?),
            StreamSource::Ai(stream) => Some(stream.next_value(&self.column, self.remaining)?),
            StreamSource::File(stream) => stream.next_value()?,
            StreamSource::Fixed(value) => Some(value.clone()),
        };
        self.remaining -= 1;
        Ok(value)
    }
}

struct FakerStream {
    rule: String,
    locale: FakerLocale,
    resolved: Option<&'static str>,
    rng: ChaCha8Rng,
}

impl FakerStream {
    fn new(source: FakerSource, seed: u64) -> Self {
        Self {
            rule: source.rule,
            locale: source.locale,
            resolved: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn next_value(&mut self, column: &str) -> Result<String, GenerationError> {
        let id = match self.resolved {
            Some(id) => id,
            None => {
                let id = faker::resolve(&self.rule).ok_or_else(|| self.unknown_rule(column))?;
                self.resolved = Some(id);
                id
            }
        };
        faker::generate(id, self.locale, &mut self.rng).ok_or_else(|| self.unknown_rule(column))
    }

    fn unknown_rule(&self, column: &str) -> GenerationError {
        GenerationError::UnknownRule {
            column: column.to_string(),
            rule: self.rule.clone(),
        }
    }
}

struct AiStream {
    table: String,
    rule: String,
    chunk_size: usize,
    backend: Arc<dyn AiBackend>,
    buffer: VecDeque<String>,
}

impl AiStream {
    fn new(
        source: AiSource,
        table: &str,
        backend: Arc<dyn AiBackend>,
        default_chunk_size: usize,
    ) -> Self {
        Self {
            table: table.to_string(),
            rule: source.rule,
            chunk_size: source.chunk_size.unwrap_or(default_chunk_size).max(1),
            backend,
            buffer: VecDeque::new(),
        }
    }

    fn next_value(&mut self, column: &str, remaining: u64) -> Result<String, GenerationError> {
        if self.buffer.is_empty() {
            let count = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.chunk_size);
            let request = AiRequest {
                table: &self.table,
                column,
                rule: &self.rule,
                count,
            };
            let mut values =
                self.backend
                    .generate(&request)
                    .map_err(|source| GenerationError::Ai {
                        column: column.to_string(),
                        source,
                    })?;
            values.truncate(count);
            self.buffer.extend(values);
        }

        self.buffer.pop_front().ok_or_else(|| GenerationError::Source {
            column: column.to_string(),
            message: format!("ai backend returned no values for rule '{}'", self.rule),
        })
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
