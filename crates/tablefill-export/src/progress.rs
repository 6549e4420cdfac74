use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::result::ExportResult;

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// One line of the worker's stdout protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    ColumnProgress {
        column: String,
        progress: u8,
    },
    RowProgress {
        table_name: String,
        progress: u8,
        row_count: u64,
    },
    TableComplete {
        table_name: String,
    },
    ExportResult(ExportResult),
}

/// Writes progress events as newline-delimited JSON, flushing every line.
pub struct ProgressReporter<W: Write> {
    out: W,
    table: String,
    total: u64,
    interval: u64,
    last_row_reported: Option<u64>,
    table_completed: bool,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, table: &str, total: u64) -> Self {
        Self {
            out,
            table: table.to_string(),
            total,
            interval: DEFAULT_PROGRESS_INTERVAL,
            last_row_reported: None,
            table_completed: false,
        }
    }

    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Report a column as fully generated.
    pub fn column_complete(&mut self, column: &str) -> io::Result<()> {
        self.emit(&ProgressEvent::ColumnProgress {
            column: column.to_string(),
            progress: 100,
        })
    }

    /// Called once row `index` is written; emits `row-progress` when the row
    /// count hits the interval or the row is the last one.
    pub fn row_written(&mut self, index: u64) -> io::Result<bool> {
        let rows = index + 1;
        let qualifies = rows % self.interval == 0 || rows == self.total;
        if !qualifies || self.last_row_reported == Some(index) {
            return Ok(false);
        }
        self.last_row_reported = Some(index);
        self.emit(&ProgressEvent::RowProgress {
            table_name: self.table.clone(),
            progress: percent(rows, self.total),
            row_count: rows,
        })?;
        Ok(true)
    }

    /// Emits `table-complete`; later calls are no-ops.
    pub fn table_complete(&mut self) -> io::Result<()> {
        if self.table_completed {
            return Ok(());
        }
        self.table_completed = true;
        self.emit(&ProgressEvent::TableComplete {
            table_name: self.table.clone(),
        })
    }

    pub fn export_result(&mut self, result: &ExportResult) -> io::Result<()> {
        self.emit(&ProgressEvent::ExportResult(result.clone()))
    }

    pub fn emit(&mut self, event: &ProgressEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn percent(rows: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((rows as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
