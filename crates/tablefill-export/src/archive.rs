use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use tablefill_core::file_stem_problem;

use crate::errors::ExportError;

const ARCHIVE_EXTENSION: &str = ".zip";
const PARTIAL_SUFFIX: &str = ".partial";
const COMPRESSION_LEVEL: i64 = 9;

/// One file to bundle, stored in the archive as `<name>.sql`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Read a JSON manifest (`[{"name": ..., "path": ...}]`).
pub fn load_manifest(path: &Path) -> Result<Vec<ArchiveEntry>, ExportError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Checks whether a file is held by another consumer before it is deleted.
pub trait FileProbe {
    fn probe(&self, path: &Path) -> io::Result<()>;
}

/// Probe that opens the file for reading and closes it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenProbe;

impl FileProbe for OpenProbe {
    fn probe(&self, path: &Path) -> io::Result<()> {
        File::open(path).map(drop)
    }
}

/// Summary of a finished consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    pub entries: usize,
    pub removed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Streams per-table SQL files into one zip archive per project.
#[derive(Debug, Clone)]
pub struct ArchiveConsolidator<P = OpenProbe> {
    root: PathBuf,
    probe: P,
}

impl ArchiveConsolidator<OpenProbe> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_probe(root, OpenProbe)
    }
}

impl<P: FileProbe> ArchiveConsolidator<P> {
    pub fn with_probe(root: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            root: root.into(),
            probe,
        }
    }

    pub fn project_dir(&self, project_id: u64) -> PathBuf {
        self.root.join(project_id.to_string())
    }

    /// Replace the project's previous archives with a new one built from
    /// `manifest`.
    ///
    /// The archive is written under a `.partial` name and renamed only once
    /// every entry was streamed and the file was synced.
    pub fn consolidate(
        &self,
        manifest: &[ArchiveEntry],
        project_id: u64,
    ) -> Result<ArchiveOutcome, ExportError> {
        validate_manifest(manifest)?;
        let dir = self.project_dir(project_id);
        let (removed, skipped) = self.remove_previous(&dir)?;
        fs::create_dir_all(&dir)?;

        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let archive_path = dir.join(format!("export_{timestamp}{ARCHIVE_EXTENSION}"));
        let partial_path = partial_path(&archive_path);

        let file = File::create(&partial_path)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));

        for entry in manifest {
            zip.start_file(format!("{}.sql", entry.name), options)?;
            let mut source = File::open(&entry.path)?;
            let bytes = io::copy(&mut source, &mut zip)?;
            debug!(name = %entry.name, path = %entry.path.display(), bytes, "archived entry");
        }

        let writer = zip.finish()?;
        let file = writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&partial_path, &archive_path)?;
        sync_dir(&dir)?;

        info!(
            project_id,
            archive = %archive_path.display(),
            entries = manifest.len(),
            removed = removed.len(),
            skipped = skipped.len(),
            "archive consolidated"
        );

        Ok(ArchiveOutcome {
            archive_path,
            entries: manifest.len(),
            removed,
            skipped,
        })
    }

    fn remove_previous(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), ExportError> {
        let mut removed = Vec::new();
        let mut skipped = Vec::new();
        if !dir.exists() {
            return Ok((removed, skipped));
        }

        let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_archive_file(path))
            .collect();
        candidates.sort();

        for path in candidates {
            if let Err(err) = self.probe.probe(&path) {
                if is_busy(&err) {
                    debug!(path = %path.display(), error = %err, "archive in use; skipping");
                    skipped.push(path);
                    continue;
                }
                return Err(err.into());
            }
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(err) if is_busy(&err) => {
                    debug!(path = %path.display(), error = %err, "archive in use; skipping");
                    skipped.push(path);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok((removed, skipped))
    }
}

fn validate_manifest(manifest: &[ArchiveEntry]) -> Result<(), ExportError> {
    if manifest.is_empty() {
        return Err(ExportError::InvalidManifest(
            "manifest has no entries".to_string(),
        ));
    }
    let mut names = HashSet::new();
    for entry in manifest {
        if entry.name.trim().is_empty() {
            return Err(ExportError::InvalidManifest(format!(
                "entry for '{}' has an empty name",
                entry.path.display()
            )));
        }
        if let Some(problem) = file_stem_problem(&entry.name) {
            return Err(ExportError::InvalidManifest(format!(
                "entry name '{}' {problem}",
                entry.name
            )));
        }
        if !names.insert(entry.name.as_str()) {
            return Err(ExportError::InvalidManifest(format!(
                "duplicate entry name '{}'",
                entry.name
            )));
        }
    }
    Ok(())
}

fn is_archive_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.ends_with(ARCHIVE_EXTENSION)
        || name.ends_with(&format!("{ARCHIVE_EXTENSION}{PARTIAL_SUFFIX}"))
}

/// Conditions meaning "someone else holds this file".
fn is_busy(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
    ) {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
