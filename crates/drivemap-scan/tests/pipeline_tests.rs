use std::fs;
use std::path::{Component, Path, PathBuf};

use drivemap_scan::{
    FileRecord, Inventory, InventoryConfig, PipelineError, RecordStore, ScanError, WarningKind,
};
use drivemap_store::{MemoryStore, SqliteStore, StoreError, StoreResult};
use tempfile::TempDir;

fn config(root: &Path, threads: usize, batch_size: usize, tag_count: usize) -> InventoryConfig {
    InventoryConfig::builder()
        .root(root)
        .threads(threads)
        .batch_size(batch_size)
        .tag_count(tag_count)
        .channel_capacity(16usize)
        .build()
        .unwrap()
}

/// Builds `dirs` nested directories with `per_dir` files each.
fn create_tree(dirs: usize, per_dir: usize) -> (TempDir, usize) {
    let temp = TempDir::new().unwrap();
    let mut dir = temp.path().to_path_buf();
    let mut total = 0;

    for d in 0..dirs {
        dir = if d % 3 == 0 {
            temp.path().join(format!("branch{d}"))
        } else {
            dir.join(format!("level{d}"))
        };
        fs::create_dir_all(&dir).unwrap();
        for f in 0..per_dir {
            fs::write(dir.join(format!("file{f}.dat")), vec![b'x'; f]).unwrap();
            total += 1;
        }
    }
    (temp, total)
}

fn dir_segments(fullpath: &str) -> Vec<String> {
    Path::new(fullpath)
        .parent()
        .unwrap()
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn assert_tag_law(record: &FileRecord, k: usize) {
    let segments = dir_segments(&record.fullpath);
    assert_eq!(record.tags.len(), k);
    let filled = segments.len().min(k);
    assert_eq!(&record.tags[..filled], &segments[..filled]);
    assert!(record.tags[filled..].iter().all(String::is_empty));
}

#[test]
fn test_two_file_scenario() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("r");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), [0u8; 10]).unwrap();
    fs::write(root.join("sub/b.TXT"), b"").unwrap();

    let db = temp.path().join("files.db");
    let store = SqliteStore::open(&db, 2).unwrap();
    let summary = Inventory::new(config(&root, 4, 10_000, 2), store).run().unwrap();

    assert_eq!(summary.files_seen, 2);
    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(summary.dirs_scanned, 2);
    assert_eq!(summary.bytes_seen, 10);
    assert!(!summary.has_warnings());

    let store = SqliteStore::open(&db, 2).unwrap();
    let mut rows = store.records().unwrap();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    let canonical = root.canonicalize().unwrap();
    assert_eq!(rows[0].name, "a.txt");
    assert_eq!(PathBuf::from(&rows[0].fullpath), canonical.join("a.txt"));
    assert_eq!(rows[0].extension, ".txt");
    assert_eq!(rows[0].size, 10);
    assert_eq!(rows[1].name, "b.TXT");
    assert_eq!(PathBuf::from(&rows[1].fullpath), canonical.join("sub").join("b.TXT"));
    assert_eq!(rows[1].extension, ".TXT");
    assert_eq!(rows[1].size, 0);

    for row in &rows {
        assert_tag_law(row, 2);
    }
}

#[test]
fn test_final_flush_of_small_run() {
    let (temp, total) = create_tree(1, 3);
    let db_dir = TempDir::new().unwrap();
    let db = db_dir.path().join("files.db");

    let store = SqliteStore::open(&db, 10).unwrap();
    let summary = Inventory::new(config(temp.path(), 8, 10_000, 10), store)
        .run()
        .unwrap();

    assert_eq!(total, 3);
    assert_eq!(summary.batches_committed, 1);
    assert_eq!(SqliteStore::open(&db, 10).unwrap().row_count().unwrap(), 3);
}

#[test]
fn test_every_file_stored_once_for_any_worker_count() {
    let (temp, total) = create_tree(12, 25);

    for threads in [1, 2, 3, 8] {
        let store = MemoryStore::new();
        let summary = Inventory::new(config(temp.path(), threads, 7, 4), store.clone())
            .run()
            .unwrap();

        assert_eq!(summary.files_seen as usize, total, "threads = {threads}");
        assert_eq!(store.len(), total, "threads = {threads}");
        assert_eq!(summary.duplicates_ignored, 0);
        for record in store.records() {
            assert_tag_law(&record, 4);
        }
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let (temp, total) = create_tree(6, 10);
    let scan_root = temp.path().join("branch0");
    let db = temp.path().join("inventory.db");

    let first = Inventory::new(
        config(&scan_root, 4, 5, 10),
        SqliteStore::open(&db, 10).unwrap(),
    )
    .run()
    .unwrap();
    let second = Inventory::new(
        config(&scan_root, 2, 1000, 10),
        SqliteStore::open(&db, 10).unwrap(),
    )
    .run()
    .unwrap();

    // branch0 holds the first three levels of the tree.
    assert_eq!(first.files_seen as usize, total / 2);
    assert_eq!(second.files_seen, first.files_seen);
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(second.duplicates_ignored, first.files_seen);
    assert_eq!(
        SqliteStore::open(&db, 10).unwrap().row_count().unwrap(),
        first.rows_inserted
    );
}

#[test]
fn test_batches_follow_batch_size() {
    let (temp, _) = create_tree(1, 5);
    let summary = Inventory::new(config(temp.path(), 2, 2, 1), MemoryStore::new())
        .run()
        .unwrap();

    // Two full batches, then the final flush of the last record.
    assert_eq!(summary.files_seen, 5);
    assert_eq!(summary.batches_committed, 3);
}

#[test]
fn test_invalid_root_is_fatal_before_writing() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let result = Inventory::new(
        InventoryConfig::new(temp.path().join("nope")),
        store.clone(),
    )
    .run();

    assert!(matches!(
        result,
        Err(PipelineError::Scan(ScanError::NotFound { .. }))
    ));
    assert!(store.is_empty());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_is_reported_and_siblings_scanned() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("t");
    fs::create_dir_all(root.join("open")).unwrap();
    fs::create_dir_all(root.join("locked")).unwrap();
    fs::write(root.join("top.txt"), "top").unwrap();
    fs::write(root.join("open/seen.txt"), "seen").unwrap();
    fs::write(root.join("locked/hidden.txt"), "hidden").unwrap();

    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running privileged: the directory is still listable.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let store = MemoryStore::new();
    let result = Inventory::new(config(&root, 2, 100, 3), store.clone()).run();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = result.unwrap();
    assert_eq!(summary.files_seen, 2);
    assert_eq!(summary.dirs_scanned, 2);
    assert_eq!(store.len(), 2);

    let canonical = root.canonicalize().unwrap();
    let seen = canonical.join("open").join("seen.txt");
    assert!(store.get(&seen.to_string_lossy()).is_some());

    let read_errors: Vec<_> = summary
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::ReadError)
        .collect();
    assert_eq!(read_errors.len(), 1);
    assert_eq!(read_errors[0].path, canonical.join("locked"));
}

struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn insert_batch(&mut self, _batch: &[FileRecord]) -> StoreResult<usize> {
        Err(StoreError::Unavailable {
            message: "storage went away".into(),
        })
    }
}

#[test]
fn test_storage_failure_aborts_run() {
    let (temp, _) = create_tree(9, 20);

    let result = Inventory::new(config(temp.path(), 4, 3, 2), UnavailableStore).run();
    assert!(matches!(
        result,
        Err(PipelineError::Store(StoreError::Unavailable { .. }))
    ));
}

#[test]
fn test_progress_ends_with_final_snapshot() {
    let (temp, total) = create_tree(3, 4);
    let inventory = Inventory::new(config(temp.path(), 2, 100, 3), MemoryStore::new());
    let mut progress_rx = inventory.subscribe();

    let summary = inventory.run().unwrap();

    let mut last = None;
    while let Ok(progress) = progress_rx.try_recv() {
        last = Some(progress);
    }
    let last = last.unwrap();
    assert_eq!(last.files_scanned as usize, total);
    assert_eq!(last.files_scanned, summary.files_seen);
}
