use std::fs::File;

use tracing::{debug, warn};

use tablefill_core::{ConfigError, ExhaustPolicy, FileColumn, FileSource, SourceKind};

use crate::errors::GenerationError;

/// Streams one field of a CSV file, record by record.
pub struct FileStream {
    column: String,
    source: FileSource,
    reader: csv::Reader<File>,
    record: csv::StringRecord,
    field: usize,
    records_in_pass: u64,
    passes: u64,
    exhausted: bool,
}

impl FileStream {
    /// Open the file and resolve the field that feeds `column`.
    pub fn open(table: &str, column: &str, source: FileSource) -> Result<Self, GenerationError> {
        let mut reader = open_reader(column, &source)?;
        let field = match &source.column {
            FileColumn::Index(index) => *index,
            FileColumn::Name(name) => {
                if !source.has_headers {
                    return Err(ConfigError::MetadataMismatch {
                        table: table.to_string(),
                        column: column.to_string(),
                        kind: SourceKind::File,
                        detail: "'column' requires 'hasHeaders'".to_string(),
                        expected: "a header row when selecting by name",
                    }
                    .into());
                }
                let headers = reader.headers().map_err(|source| GenerationError::Csv {
                    column: column.to_string(),
                    source,
                })?;
                headers
                    .iter()
                    .position(|header| header == name)
                    .ok_or_else(|| GenerationError::Source {
                        column: column.to_string(),
                        message: format!(
                            "file '{}' has no header named '{name}'",
                            source.path.display()
                        ),
                    })?
            }
        };

        Ok(Self {
            column: column.to_string(),
            source,
            reader,
            record: csv::StringRecord::new(),
            field,
            records_in_pass: 0,
            passes: 1,
            exhausted: false,
        })
    }

    /// Next field value, or `None` once a `stop` file is exhausted.
    pub fn next_value(&mut self) -> Result<Option<String>, GenerationError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            let has_record = self
                .reader
                .read_record(&mut self.record)
                .map_err(|source| GenerationError::Csv {
                    column: self.column.clone(),
                    source,
                })?;
            if has_record {
                self.records_in_pass += 1;
                let value = self.record.get(self.field).ok_or_else(|| GenerationError::Source {
                    column: self.column.clone(),
                    message: format!(
                        "record {} of '{}' has no field {}",
                        self.records_in_pass,
                        self.source.path.display(),
                        self.field
                    ),
                })?;
                return Ok(Some(value.to_string()));
            }

            match self.source.on_exhausted {
                ExhaustPolicy::Stop => {
                    warn!(
                        column = %self.column,
                        path = %self.source.path.display(),
                        records = self.records_in_pass,
                        "file exhausted; column omitted from remaining rows"
                    );
                    self.exhausted = true;
                    return Ok(None);
                }
                ExhaustPolicy::Cycle => {
                    if self.records_in_pass == 0 {
                        return Err(GenerationError::Source {
                            column: self.column.clone(),
                            message: format!(
                                "file '{}' has no records",
                                self.source.path.display()
                            ),
                        });
                    }
                    self.passes += 1;
                    debug!(
                        column = %self.column,
                        pass = self.passes,
                        "restarting file source"
                    );
                    self.reader = open_reader(&self.column, &self.source)?;
                    self.records_in_pass = 0;
                }
            }
        }
    }
}

fn open_reader(column: &str, source: &FileSource) -> Result<csv::Reader<File>, GenerationError> {
    csv::ReaderBuilder::new()
        .has_headers(source.has_headers)
        .delimiter(source.delimiter)
        .flexible(true)
        .from_path(&source.path)
        .map_err(|err| GenerationError::Csv {
            column: column.to_string(),
            source: err,
        })
}
