use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tablefill_export::{ArchiveConsolidator, ArchiveEntry, FileProbe, load_manifest};

/// Reports every `.zip` whose name contains "locked" as held by another process.
struct LockedProbe;

impl FileProbe for LockedProbe {
    fn probe(&self, path: &Path) -> io::Result<()> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.contains("locked") {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        File::open(path).map(drop)
    }
}

struct BrokenProbe;

impl FileProbe for BrokenProbe {
    fn probe(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::InvalidData))
    }
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("open archive"))
        .expect("read archive");
    (0..archive.len())
        .map(|idx| {
            let mut file = archive.by_index(idx).expect("entry");
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).expect("read entry");
            (file.name().to_string(), bytes)
        })
        .collect()
}

fn zip_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.to_string_lossy().ends_with(".zip"))
        .collect();
    files.sort();
    files
}

#[test]
fn archives_manifest_entry_with_sql_suffix() {
    let root = temp_dir("single");
    let source = root.join("orders.sql");
    fs::write(&source, "-- Table: orders\nINSERT INTO \"orders\" (\"id\") VALUES\n('1');\n")
        .expect("write source");

    let consolidator = ArchiveConsolidator::new(root.join("archives"));
    let manifest = vec![ArchiveEntry {
        name: "orders".to_string(),
        path: source.clone(),
    }];
    let outcome = consolidator.consolidate(&manifest, 7).expect("consolidate");

    assert_eq!(outcome.entries, 1);
    assert!(outcome.archive_path.starts_with(root.join("archives").join("7")));
    let entries = read_entries(&outcome.archive_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "orders.sql");
    assert_eq!(entries[0].1, fs::read(&source).expect("read source"));
}

#[test]
fn replaces_previous_archives() {
    let root = temp_dir("replace");
    let source = root.join("users.sql");
    fs::write(&source, "-- Table: users\n").expect("write source");
    let consolidator = ArchiveConsolidator::new(root.join("archives"));
    let project_dir = consolidator.project_dir(3);
    fs::create_dir_all(&project_dir).expect("create project dir");
    let stale = project_dir.join("export_old.zip");
    fs::write(&stale, b"stale").expect("write stale archive");
    let unrelated = project_dir.join("notes.txt");
    fs::write(&unrelated, b"keep").expect("write unrelated");

    let manifest = vec![ArchiveEntry {
        name: "users".to_string(),
        path: source,
    }];
    let outcome = consolidator.consolidate(&manifest, 3).expect("consolidate");

    assert_eq!(outcome.removed, vec![stale.clone()]);
    assert!(!stale.exists());
    assert!(unrelated.exists());
    assert_eq!(zip_files(&project_dir), vec![outcome.archive_path]);
}

#[test]
fn busy_previous_archive_is_skipped() {
    let root = temp_dir("busy");
    let source = root.join("orders.sql");
    fs::write(&source, "-- Table: orders\n").expect("write source");
    let consolidator = ArchiveConsolidator::with_probe(root.join("archives"), LockedProbe);
    let project_dir = consolidator.project_dir(7);
    fs::create_dir_all(&project_dir).expect("create project dir");
    let locked = project_dir.join("export_locked.zip");
    fs::write(&locked, b"in use").expect("write locked archive");

    let manifest = vec![ArchiveEntry {
        name: "orders".to_string(),
        path: source,
    }];
    let outcome = consolidator.consolidate(&manifest, 7).expect("consolidate despite busy file");

    assert_eq!(outcome.skipped, vec![locked.clone()]);
    assert!(locked.exists());
    assert!(outcome.archive_path.exists());
    assert_eq!(read_entries(&outcome.archive_path)[0].0, "orders.sql");
}

#[test]
fn other_probe_failures_are_fatal() {
    let root = temp_dir("probe_error");
    let source = root.join("orders.sql");
    fs::write(&source, "-- Table: orders\n").expect("write source");
    let consolidator = ArchiveConsolidator::with_probe(root.join("archives"), BrokenProbe);
    let project_dir = consolidator.project_dir(1);
    fs::create_dir_all(&project_dir).expect("create project dir");
    fs::write(project_dir.join("export_old.zip"), b"old").expect("write archive");

    let manifest = vec![ArchiveEntry {
        name: "orders".to_string(),
        path: source,
    }];
    assert!(consolidator.consolidate(&manifest, 1).is_err());
}

#[test]
fn missing_input_fails_without_publishing_an_archive() {
    let root = temp_dir("missing");
    let consolidator = ArchiveConsolidator::new(root.join("archives"));
    let manifest = vec![ArchiveEntry {
        name: "ghost".to_string(),
        path: root.join("ghost.sql"),
    }];

    assert!(consolidator.consolidate(&manifest, 9).is_err());
    assert!(zip_files(&consolidator.project_dir(9)).is_empty());
}

#[test]
fn loads_json_manifest() {
    let root = temp_dir("manifest");
    let manifest_path = root.join("manifest.json");
    fs::write(
        &manifest_path,
        r#"[{"name": "orders", "path": "/tmp/orders.sql"}, {"name": "users", "path": "/tmp/users.sql"}]"#,
    )
    .expect("write manifest");

    let manifest = load_manifest(&manifest_path).expect("load manifest");
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest[1].name, "users");
    assert_eq!(manifest[1].path, PathBuf::from("/tmp/users.sql"));
}

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("tablefill_archive_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
