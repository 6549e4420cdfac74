use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use tablefill_core::Dialect;
use tablefill_generate::Row;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Buffers rows and appends them to a table's SQL file as INSERT statements.
pub struct SqlBatchWriter {
    path: PathBuf,
    file: File,
    statement_prefix: String,
    buffer: Vec<String>,
    batch_size: usize,
    rows_written: u64,
    statements: u64,
}

impl SqlBatchWriter {
    /// Create (or truncate) the output file and write its header comment.
    pub fn create(
        path: &Path,
        table: &str,
        columns: &[&str],
        dialect: Dialect,
        batch_size: usize,
    ) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        writeln!(file, "-- Table: {table}")?;

        let quoted_columns: Vec<String> = columns
            .iter()
            .map(|column| dialect.quote_ident(column))
            .collect();
        let statement_prefix = format!(
            "INSERT INTO {} ({}) VALUES\n",
            dialect.quote_ident(table),
            quoted_columns.join(", ")
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            statement_prefix,
            buffer: Vec::new(),
            batch_size: batch_size.max(1),
            rows_written: 0,
            statements: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn statements(&self) -> u64 {
        self.statements
    }

    /// Append the row's tuple to the in-memory buffer.
    pub fn push_row(&mut self, row: &Row) {
        self.buffer.push(format_tuple(row));
    }

    /// True when the buffer hit the batch size or the last row is buffered.
    pub fn should_flush(&self, is_last_row: bool) -> bool {
        !self.buffer.is_empty() && (self.buffer.len() >= self.batch_size || is_last_row)
    }

    /// Write the buffered tuples as one INSERT statement and clear the buffer.
    pub fn flush_batch(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut statement = String::with_capacity(
            self.statement_prefix.len() + self.buffer.iter().map(|t| t.len() + 2).sum::<usize>(),
        );
        statement.push_str(&self.statement_prefix);
        statement.push_str(&self.buffer.join(",\n"));
        statement.push_str(";\n");

        self.file.write_all(statement.as_bytes())?;
        self.file.flush()?;

        let rows = self.buffer.len() as u64;
        self.rows_written += rows;
        self.statements += 1;
        self.buffer.clear();
        debug!(
            path = %self.path.display(),
            rows,
            statements = self.statements,
            "flushed insert batch"
        );
        Ok(())
    }

    /// Flush anything still buffered and close the file.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.flush_batch()?;
        Ok(self.path)
    }
}

fn format_tuple(row: &Row) -> String {
    let values: Vec<String> = row.values.iter().map(|value| format!("'{value}'")).collect();
    format!("({})", values.join(", "))
}
