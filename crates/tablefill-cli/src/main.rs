mod logging;
mod settings;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tablefill_core::{ConfigError, TaskDescriptor, task_json_schema};
use tablefill_export::{
    ArchiveConsolidator, ExportError, ExportResult, ProgressReporter, Worker, load_manifest,
};
use tablefill_generate::{AiError, HttpAiBackend};
use thiserror::Error;
use tracing::{error, info};

use logging::init_logging;
use settings::{Settings, SettingsError};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Task(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("ai backend error: {0}")]
    Ai(#[from] AiError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "tablefill", version, about = "Synthetic table data exporter")]
struct Cli {
    /// TOML settings file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Append JSON logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one table described by a task descriptor.
    Worker(WorkerArgs),
    /// Bundle exported SQL files into a project archive.
    Archive(ArchiveArgs),
    /// Print the JSON Schema of the task descriptor.
    TaskSchema,
}

#[derive(Args, Debug)]
struct WorkerArgs {
    /// Task descriptor path; `-` or omitted reads stdin.
    #[arg(long, value_name = "PATH")]
    task: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    progress_interval: Option<u64>,
    /// Endpoint of the AI generation service.
    #[arg(long)]
    ai_endpoint: Option<String>,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    #[arg(long)]
    project: u64,
    /// JSON manifest: `[{"name": ..., "path": ...}]`.
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,
    #[arg(long)]
    archive_dir: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename = "archive-complete", rename_all = "camelCase")]
struct ArchiveComplete {
    archive_path: String,
    entries: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.log_file.as_deref()) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let config = cli.config.as_deref();
    let outcome = match cli.command {
        Command::Worker(args) => run_worker(config, args),
        Command::Archive(args) => run_archive(config, args),
        Command::TaskSchema => print_task_schema(),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// A worker invocation that failed before the export started.
#[derive(Debug)]
struct Rejected {
    table: String,
    sql_path: PathBuf,
    error: CliError,
}

fn run_worker(config: Option<&Path>, args: WorkerArgs) -> Result<ExitCode, CliError> {
    let mut out = io::stdout().lock();
    let result = match prepare_worker(config, args) {
        Ok((worker, task)) => worker.run(&task, &mut out),
        Err(rejected) => {
            error!(table = %rejected.table, error = %rejected.error, "worker rejected");
            report_rejection(&mut out, &rejected)?
        }
    };
    Ok(ExitCode::from(result.exit_code()))
}

/// Every pre-export failure still ends stdout with an `export-result` line.
fn report_rejection<W: Write>(out: W, rejected: &Rejected) -> io::Result<ExportResult> {
    let result = ExportResult::failure(
        &rejected.table,
        &rejected.sql_path,
        rejected.error.to_string(),
    );
    ProgressReporter::new(out, &rejected.table, 0).export_result(&result)?;
    Ok(result)
}

fn prepare_worker(
    config: Option<&Path>,
    args: WorkerArgs,
) -> Result<(Worker, TaskDescriptor), Rejected> {
    let WorkerArgs {
        task,
        output_dir,
        batch_size,
        progress_interval,
        ai_endpoint,
    } = args;

    let task = read_task(task.as_deref()).map_err(|error| Rejected {
        table: String::new(),
        sql_path: PathBuf::new(),
        error,
    })?;
    let table = task.table.name.clone();

    let mut settings = Settings::load(config).map_err(|err| Rejected {
        table: table.clone(),
        sql_path: PathBuf::new(),
        error: err.into(),
    })?;
    if let Some(dir) = output_dir {
        settings.output_dir = dir;
    }
    if let Some(size) = batch_size {
        settings.batch_size = size;
    }
    if let Some(interval) = progress_interval {
        settings.progress_interval = interval;
    }
    if ai_endpoint.is_some() {
        settings.ai.endpoint = ai_endpoint;
    }

    let mut worker = Worker::new(settings.worker_options());
    if let Some(endpoint) = settings.ai.endpoint.as_deref() {
        let backend =
            HttpAiBackend::new(endpoint, settings.ai_timeout()).map_err(|err| Rejected {
                table: table.clone(),
                sql_path: worker.sql_path(&task),
                error: err.into(),
            })?;
        info!(endpoint = backend.endpoint(), "using ai backend");
        worker = worker.with_ai_backend(Arc::new(backend));
    }
    Ok((worker, task))
}

fn read_task(path: Option<&Path>) -> Result<TaskDescriptor, CliError> {
    let content = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).map_err(|err| {
            CliError::Task(format!("failed to read task '{}': {err}", path.display()))
        })?,
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| CliError::Task(format!("failed to read task from stdin: {err}")))?;
            buffer
        }
    };
    Ok(TaskDescriptor::from_json(&content)?)
}

fn run_archive(config: Option<&Path>, args: ArchiveArgs) -> Result<ExitCode, CliError> {
    let settings = Settings::load(config)?;
    let archive_dir = args.archive_dir.unwrap_or(settings.archive_dir);
    let manifest = load_manifest(&args.manifest)?;

    let consolidator = ArchiveConsolidator::new(archive_dir);
    let outcome = consolidator.consolidate(&manifest, args.project)?;

    let line = ArchiveComplete {
        archive_path: outcome.archive_path.display().to_string(),
        entries: outcome.entries,
    };
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &line)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn print_task_schema() -> Result<ExitCode, CliError> {
    let schema = task_json_schema();
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &schema)?;
    stdout.write_all(b"\n")?;
    Ok(ExitCode::SUCCESS)
}
