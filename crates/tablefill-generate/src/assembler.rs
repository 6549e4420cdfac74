use std::io;

use tablefill_core::{TableSpec, escape_literal};

use crate::errors::GenerationError;
use crate::stream::{ColumnStream, StreamContext};

/// One assembled row.
///
/// `values` are escaped for a single-quoted SQL literal and follow column
/// order; a column whose stream had no value is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: u64,
    pub values: Vec<String>,
}

/// Advances every column stream in lock-step.
pub struct RowAssembler {
    streams: Vec<ColumnStream>,
    total: u64,
    next_index: u64,
}

impl RowAssembler {
    pub fn new(streams: Vec<ColumnStream>, total: u64) -> Self {
        Self {
            streams,
            total,
            next_index: 0,
        }
    }

    /// Open one stream per column, failing before any row is produced.
    pub fn open(table: &TableSpec, ctx: &StreamContext<'_>) -> Result<Self, GenerationError> {
        let streams = table
            .columns
            .iter()
            .map(|column| ColumnStream::open(column, table.record_count, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(streams, table.record_count))
    }

    pub fn rows_assembled(&self) -> u64 {
        self.next_index
    }

    pub fn is_last(&self, index: u64) -> bool {
        index + 1 == self.total
    }

    /// Build the next row, or `None` once `total` rows were produced.
    ///
    /// On the final row `on_column_complete` is called for each column, in
    /// column order, right after that column's value is drawn.
    pub fn next_row<F>(&mut self, mut on_column_complete: F) -> Result<Option<Row>, GenerationError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        if self.next_index >= self.total {
            return Ok(None);
        }
        let index = self.next_index;
        let last = self.is_last(index);

        let mut values = Vec::with_capacity(self.streams.len());
        for stream in &mut self.streams {
            if let Some(value) = stream.next_value()? {
                values.push(escape_literal(&value));
            }
            if last {
                on_column_complete(stream.column())?;
            }
        }

        self.next_index += 1;
        Ok(Some(Row { index, values }))
    }
}
