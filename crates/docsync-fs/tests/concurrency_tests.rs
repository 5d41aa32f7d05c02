//! Concurrent access tests for write_atomic locking
//!
//! Verifies that the fs2-based sidecar lock keeps concurrent writers of one
//! file from interleaving, and that writers of distinct files do not block
//! each other.

use docsync_fs::{NormalizedPath, RobustnessConfig, io};
use fs2::FileExt;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_concurrent_writes_no_corruption() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("concurrent.json");
    let path = Arc::new(NormalizedPath::new(&file_path));

    let num_threads = 8;
    let writes_per_thread = 10;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..writes_per_thread {
                    let content = format!("{{\"thread\":{},\"write\":{}}}", thread_id, i);
                    io::write_text(&path, &content).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    // Whatever write landed last, the file must be one complete document
    let content = std::fs::read_to_string(&file_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(parsed.get("thread").is_some());
    assert_eq!(content.matches("thread").count(), 1);
}

#[test]
fn test_concurrent_writes_to_different_files_all_succeed() {
    let dir = tempdir().unwrap();
    let num_threads = 5;
    let barrier = Arc::new(Barrier::new(num_threads));
    let results = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let dir_path = dir.path().to_path_buf();
            let barrier = Arc::clone(&barrier);
            let results = Arc::clone(&results);

            thread::spawn(move || {
                barrier.wait();
                let path = NormalizedPath::new(dir_path.join(format!("doc_{}.json", thread_id)));
                let result = io::write_text(&path, &format!("[{}]", thread_id));
                results.lock().unwrap().push((thread_id, result.is_ok()));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let results = results.lock().unwrap();
    assert_eq!(results.len(), num_threads);
    for (thread_id, success) in results.iter() {
        assert!(*success, "Write from thread {} should succeed", thread_id);
    }
}

#[test]
fn test_lock_timeout_is_respected() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("locked.json");
    let lock_path = io::lock_path_for(&file_path);

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .unwrap();
    lock_file.lock_exclusive().unwrap();

    let path = NormalizedPath::new(&file_path);
    let config = RobustnessConfig {
        lock_timeout: Duration::from_millis(200),
        enable_fsync: false,
    };

    let result = io::write_atomic(&path, b"{}", config);
    drop(lock_file);

    assert!(
        matches!(result, Err(docsync_fs::Error::LockFailed { .. })),
        "Write should fail while the lock is held, got {:?}",
        result
    );
    assert!(!file_path.exists());
}
