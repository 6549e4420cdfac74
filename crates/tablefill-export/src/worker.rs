use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use tablefill_core::TaskDescriptor;
use tablefill_generate::{AiBackend, DEFAULT_AI_CHUNK_SIZE, RowAssembler, StreamContext};

use crate::errors::ExportError;
use crate::progress::{DEFAULT_PROGRESS_INTERVAL, ProgressReporter};
use crate::result::ExportResult;
use crate::writer::{DEFAULT_BATCH_SIZE, SqlBatchWriter};

/// Options for one export worker.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Root directory; files land in `<output_dir>/<project_id>/<table>.sql`.
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub progress_interval: u64,
    /// Pause between the last write and `table-complete`.
    pub settle_before_sync: Duration,
    /// Pause after the durable sync, before the worker returns.
    pub settle_after_sync: Duration,
    pub ai_chunk_size: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out/sql"),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            settle_before_sync: Duration::from_millis(250),
            settle_after_sync: Duration::from_millis(250),
            ai_chunk_size: DEFAULT_AI_CHUNK_SIZE,
        }
    }
}

/// Lifecycle of a worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Init,
    Streaming,
    Flushing,
    Finalizing,
    Succeeded,
    Failed,
}

type SyncFn = fn(&Path) -> io::Result<()>;

/// Runs a single table export from task descriptor to synced SQL file.
#[derive(Clone)]
pub struct Worker {
    options: WorkerOptions,
    ai_backend: Option<Arc<dyn AiBackend>>,
    sync: SyncFn,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(WorkerOptions::default())
    }
}

struct RunState<'a> {
    table: &'a str,
    phase: WorkerPhase,
}

impl RunState<'_> {
    fn enter(&mut self, phase: WorkerPhase) {
        debug!(table = self.table, from = ?self.phase, to = ?phase, "worker phase");
        self.phase = phase;
    }
}

struct RunStats {
    rows: u64,
    statements: u64,
}

impl Worker {
    pub fn new(options: WorkerOptions) -> Self {
        Self {
            options,
            ai_backend: None,
            sync: sync_file,
        }
    }

    pub fn with_ai_backend(mut self, backend: Arc<dyn AiBackend>) -> Self {
        self.ai_backend = Some(backend);
        self
    }

    /// Output path for a task's SQL file.
    pub fn sql_path(&self, task: &TaskDescriptor) -> PathBuf {
        self.options
            .output_dir
            .join(task.project_id.to_string())
            .join(format!("{}.sql", task.table.name))
    }

    /// Run the task, streaming progress to `out`, and return the terminal
    /// result. The result is also written to `out` as the final line.
    pub fn run<W: Write>(&self, task: &TaskDescriptor, out: W) -> ExportResult {
        let table = task.table.name.as_str();
        let sql_path = self.sql_path(task);
        let mut reporter = ProgressReporter::new(out, table, task.table.record_count)
            .with_interval(self.options.progress_interval);
        let mut state = RunState {
            table,
            phase: WorkerPhase::Init,
        };
        let start = Instant::now();

        info!(
            project_id = task.project_id,
            table,
            rows = task.table.record_count,
            columns = task.table.columns.len(),
            dbms = %task.dbms,
            "export started"
        );

        let result = match self.execute(task, &sql_path, &mut reporter, &mut state) {
            Ok(stats) => {
                state.enter(WorkerPhase::Succeeded);
                info!(
                    table,
                    rows = stats.rows,
                    statements = stats.statements,
                    path = %sql_path.display(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "export completed"
                );
                ExportResult::success(table, &sql_path)
            }
            Err(err) => {
                let failed_in = state.phase;
                state.enter(WorkerPhase::Failed);
                warn!(table, phase = ?failed_in, error = %err, "export failed");
                ExportResult::failure(table, &sql_path, err.to_string())
            }
        };

        if let Err(err) = reporter.export_result(&result) {
            warn!(table, error = %err, "failed to write export result");
        }
        result
    }

    fn execute<W: Write>(
        &self,
        task: &TaskDescriptor,
        sql_path: &Path,
        reporter: &mut ProgressReporter<W>,
        state: &mut RunState<'_>,
    ) -> Result<RunStats, ExportError> {
        task.validate()?;
        let dialect = task.dialect()?;
        let table = &task.table;

        let mut ctx = StreamContext::new(&table.name, task.seed);
        ctx.ai_backend = self.ai_backend.clone();
        ctx.default_chunk_size = self.options.ai_chunk_size;
        let mut assembler = RowAssembler::open(table, &ctx)?;

        let mut writer = SqlBatchWriter::create(
            sql_path,
            &table.name,
            &table.column_names(),
            dialect,
            self.options.batch_size,
        )?;

        state.enter(WorkerPhase::Streaming);
        while let Some(row) = assembler.next_row(|column| reporter.column_complete(column))? {
            writer.push_row(&row);
            if writer.should_flush(assembler.is_last(row.index)) {
                state.enter(WorkerPhase::Flushing);
                writer.flush_batch()?;
                state.enter(WorkerPhase::Streaming);
            }
            reporter.row_written(row.index)?;
        }

        state.enter(WorkerPhase::Finalizing);
        let stats = RunStats {
            rows: writer.rows_written(),
            statements: writer.statements(),
        };
        let path = writer.finish()?;

        thread::sleep(self.options.settle_before_sync);
        reporter.table_complete()?;
        if let Err(err) = (self.sync)(&path) {
            warn!(path = %path.display(), error = %err, "failed to sync output file");
        }
        thread::sleep(self.options.settle_after_sync);

        Ok(stats)
    }
}

/// Reopen the file read/write and force its contents to the storage device.
fn sync_file(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    file.sync_all()
}
