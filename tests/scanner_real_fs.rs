// tests/scanner_real_fs.rs

mod common;
use crate::common::{set_mtime, write_with_mtime};

use std::error::Error;
use std::fs;

use rerun::fs::RealFileSystem;
use rerun::log_buffer::LogBuffer;
use rerun::watch::{ChangeWatcher, ExcludeSet};

type TestResult = Result<(), Box<dyn Error>>;

const SEC: u64 = 1_000_000_000;

fn watcher() -> ChangeWatcher<RealFileSystem> {
    ChangeWatcher::new(RealFileSystem, ExcludeSet::empty())
}

#[test]
fn empty_directory_scans_to_zero() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut log = LogBuffer::new(8);
    assert_eq!(watcher().latest_modified_time(dir.path(), &mut log)?, 0);
    assert!(log.is_empty());
    Ok(())
}

#[test]
fn nested_maximum_is_found() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_with_mtime(&dir.path().join("a.txt"), 100)?;
    write_with_mtime(&dir.path().join("sub/deeper/b.txt"), 300)?;
    write_with_mtime(&dir.path().join("sub/c.txt"), 200)?;
    let mut log = LogBuffer::new(8);

    assert_eq!(watcher().latest_modified_time(dir.path(), &mut log)?, 300 * SEC);
    Ok(())
}

#[test]
fn repeated_scans_are_equal_and_later_writes_are_larger() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("main.rs");
    write_with_mtime(&file, 1_000)?;
    let mut log = LogBuffer::new(8);
    let mut w = watcher();

    let a = w.latest_modified_time(dir.path(), &mut log)?;
    let b = w.latest_modified_time(dir.path(), &mut log)?;
    assert_eq!(a, b);

    set_mtime(&file, 1_001)?;
    let c = w.latest_modified_time(dir.path(), &mut log)?;
    assert!(c > b);
    Ok(())
}

#[test]
fn single_file_can_be_watched() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("config.toml");
    write_with_mtime(&file, 42)?;
    let mut log = LogBuffer::new(8);
    assert_eq!(watcher().latest_modified_time(&file, &mut log)?, 42 * SEC);
    Ok(())
}

#[test]
fn missing_root_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let gone = dir.path().join("gone");
    let mut log = LogBuffer::new(8);
    let err = watcher().latest_modified_time(&gone, &mut log).unwrap_err();
    assert_eq!(err.path, gone);
    assert_eq!(log.len(), 1);
    Ok(())
}

#[test]
fn deleted_root_flips_from_ok_to_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("w");
    write_with_mtime(&root.join("x"), 5)?;
    let mut log = LogBuffer::new(8);
    let mut w = watcher();

    assert!(w.latest_modified_time(&root, &mut log).is_ok());
    fs::remove_dir_all(&root)?;
    assert!(w.latest_modified_time(&root, &mut log).is_err());
    Ok(())
}

#[test]
fn excluded_directories_are_pruned() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_with_mtime(&dir.path().join("src/lib.rs"), 10)?;
    write_with_mtime(&dir.path().join("target/debug/out"), 99)?;
    write_with_mtime(&dir.path().join("src/.main.rs.swp"), 50)?;
    let exclude = ExcludeSet::new(&["target".to_string(), "**/*.swp".to_string()])?;
    let mut w = ChangeWatcher::new(RealFileSystem, exclude);
    let mut log = LogBuffer::new(8);

    assert_eq!(w.latest_modified_time(dir.path(), &mut log)?, 10 * SEC);
    Ok(())
}

#[cfg(unix)]
#[test]
fn dangling_symlink_is_skipped_and_reported_once() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_with_mtime(&dir.path().join("ok.txt"), 7)?;
    std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("broken"))?;
    let mut log = LogBuffer::new(8);
    let mut w = watcher();

    assert_eq!(w.latest_modified_time(dir.path(), &mut log)?, 7 * SEC);
    assert_eq!(w.latest_modified_time(dir.path(), &mut log)?, 7 * SEC);
    assert_eq!(log.len(), 1);
    assert!(log.snapshot()[0].text.contains("broken"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn self_symlinks_are_scanned_once() -> TestResult {
    use std::os::unix::fs::symlink;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    let dir = tempfile::tempdir()?;
    write_with_mtime(&dir.path().join("main.rs"), 500)?;
    for i in 0..50 {
        write_with_mtime(&dir.path().join(format!("src/f{i}.rs")), 100)?;
    }
    symlink(".", dir.path().join("a"))?;
    symlink(".", dir.path().join("b"))?;
    symlink("..", dir.path().join("src/up"))?;

    // The scan runs off-thread so a regression fails here instead of hanging.
    let root = dir.path().to_path_buf();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut log = LogBuffer::new(8);
        let ts = watcher().latest_modified_time(&root, &mut log);
        let _ = tx.send((ts.map_err(|e| e.to_string()), log.len()));
    });
    let (ts, logged) = rx.recv_timeout(Duration::from_secs(10))?;

    assert_eq!(ts?, 500 * SEC);
    assert_eq!(logged, 0);
    Ok(())
}
