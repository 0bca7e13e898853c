//! End-to-end tests for the monitor facade.
//!
//! Tests cover:
//!  1. Register → intact
//!  2. Modify → modified, baseline kept
//!  3. Delete → missing, restore → intact
//!  4. Repeated checks without changes
//!  5. Unsupported algorithm names
//!  6. Bulk registration with a bad path
//!  7. Reopening the database
//!  8. Parallel and sequential bulk checks agree

use fim_core::{
    fingerprint_bytes, Algorithm, CancelFlag, CheckSummary, FingerprintError, Monitor, MonitorConfig,
    Status, VerificationResult,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, Monitor) {
    let dir = tempdir().unwrap();
    let monitor = Monitor::open_at(dir.path().join("integrity_database.json"));
    (dir, monitor)
}

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn paths(group: &[VerificationResult]) -> Vec<String> {
    group.iter().map(|r| r.path.clone()).collect()
}

fn grouped_paths(summary: &CheckSummary) -> [Vec<String>; 4] {
    [
        paths(&summary.intact),
        paths(&summary.modified),
        paths(&summary.missing),
        paths(&summary.errors),
    ]
}

// ─── Test 1: Register → intact ──────────────────────────────────────────────

#[test]
fn registered_file_checks_intact() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"hello");

    let record = monitor.register(&file, Algorithm::Sha256).unwrap();
    assert_eq!(record.status, Status::Intact);

    let result = monitor.check(&file).unwrap();
    assert_eq!(result.status, Status::Intact);
    assert_eq!(result.baseline(), Some(fingerprint_bytes(b"hello", Algorithm::Sha256).as_str()));
    assert_eq!(result.observed_size, Some(5));
}

// ─── Test 2: Modify → modified ──────────────────────────────────────────────

#[test]
fn modification_is_reported_against_baseline() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"hello");
    monitor.register(&file, Algorithm::Sha256).unwrap();
    let hello = fingerprint_bytes(b"hello", Algorithm::Sha256);
    let world = fingerprint_bytes(b"world", Algorithm::Sha256);

    fs::write(&file, b"world").unwrap();
    for _ in 0..2 {
        let result = monitor.check(&file).unwrap();
        assert_eq!(result.status, Status::Modified);
        let record = result.record.unwrap();
        assert_eq!(record.fingerprint, hello);
        assert_eq!(record.previous_fingerprint.as_deref(), Some(hello.as_str()));
        assert_eq!(record.current_fingerprint.as_deref(), Some(world.as_str()));
    }
    assert_eq!(monitor.get(&file).unwrap().status, Status::Modified);
}

// ─── Test 3: Delete → missing → restore ─────────────────────────────────────

#[test]
fn missing_file_recovers_when_restored() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"hello");
    monitor.register(&file, Algorithm::Md5).unwrap();

    fs::write(&file, b"tampered").unwrap();
    assert_eq!(monitor.check(&file).unwrap().status, Status::Modified);

    fs::remove_file(&file).unwrap();
    let result = monitor.check(&file).unwrap();
    assert_eq!(result.status, Status::Missing);
    assert!(result.record.as_ref().unwrap().current_fingerprint.is_none());

    fs::write(&file, b"hello").unwrap();
    let result = monitor.check(&file).unwrap();
    assert_eq!(result.status, Status::Intact);
    let record = result.record.unwrap();
    assert!(record.previous_fingerprint.is_none());
    assert!(record.current_fingerprint.is_none());
}

// ─── Test 4: Idempotence ────────────────────────────────────────────────────

#[test]
fn repeated_checks_keep_baseline() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"stable");
    let registered = monitor.register(&file, Algorithm::Sha512).unwrap();

    let first = monitor.check(&file).unwrap();
    let second = monitor.check(&file).unwrap();
    assert_eq!(first.status, Status::Intact);
    assert_eq!(second.status, Status::Intact);
    let stored = monitor.get(&file).unwrap();
    assert_eq!(stored.fingerprint, registered.fingerprint);
    assert_eq!(stored.created_at, registered.created_at);
    assert!(stored.last_checked_at >= registered.last_checked_at);
}

#[test]
fn unregistered_path_is_unknown_and_not_stored() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "stray.txt", b"x");
    let result = monitor.check(&file).unwrap();
    assert_eq!(result.status, Status::Unknown);
    assert!(result.record.is_none());
    assert!(monitor.is_empty());
    assert!(!monitor.database_path().exists());
}

// ─── Test 5: Unsupported algorithm ──────────────────────────────────────────

#[test]
fn crc32_is_rejected_before_registration() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"hello");

    let err = fim_core::fingerprint::fingerprint_named(&file, "crc32").unwrap_err();
    assert!(matches!(err, FingerprintError::UnsupportedAlgorithm { .. }));

    // Same path a caller takes from a user-supplied name to a record.
    let attempt = "crc32"
        .parse::<Algorithm>()
        .map(|algorithm| monitor.register(&file, algorithm));
    match attempt {
        Err(FingerprintError::UnsupportedAlgorithm { algorithm }) => assert_eq!(algorithm, "crc32"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(monitor.is_empty());
    assert!(!monitor.database_path().exists());

    let record = "SHA-256"
        .parse::<Algorithm>()
        .map(|algorithm| monitor.register(&file, algorithm))
        .unwrap()
        .unwrap();
    assert_eq!(record.algorithm, Algorithm::Sha256);
    assert_eq!(monitor.len(), 1);
}

#[cfg(unix)]
#[test]
fn non_utf8_file_is_never_reported_missing() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (dir, monitor) = setup();
    let file = dir.path().join(OsStr::from_bytes(b"bad\xff.txt"));
    if fs::write(&file, b"hello").is_err() {
        return;
    }
    let good = write(dir.path(), "good.txt", b"hello");

    assert!(monitor.register(&file, Algorithm::Sha256).is_err());
    assert_eq!(monitor.check(&file).unwrap().status, Status::Unknown);

    let outcome = monitor.register_many([file, good], Algorithm::Sha256);
    assert_eq!(outcome.registered, 1);
    let summary = monitor.check_all().unwrap();
    assert_eq!(summary.intact.len(), 1);
    assert!(summary.missing.is_empty());
}

// ─── Test 6: Bulk registration ──────────────────────────────────────────────

#[test]
fn bulk_registration_counts_successes() {
    let (dir, monitor) = setup();
    let valid = write(dir.path(), "valid.txt", b"ok");
    let outcome = monitor.register_many([valid, dir.path().join("nonexistent.txt")], Algorithm::Sha256);

    assert_eq!(outcome.registered, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(monitor.len(), 1);
}

// ─── Test 7: Durability ─────────────────────────────────────────────────────

#[test]
fn reopened_database_reproduces_records() {
    let (dir, monitor) = setup();
    let kept = write(dir.path(), "kept.txt", b"hello");
    let changed = write(dir.path(), "changed.txt", b"hello");
    let dropped = write(dir.path(), "dropped.txt", b"bye");
    monitor.register(&kept, Algorithm::Sha256).unwrap();
    monitor.register(&changed, Algorithm::Sha1).unwrap();
    monitor.register(&dropped, Algorithm::Md5).unwrap();

    fs::write(&changed, b"world").unwrap();
    monitor.check_all().unwrap();
    assert!(monitor.unregister(&dropped).unwrap());

    let reopened = Monitor::open_at(monitor.database_path());
    assert!(reopened.load_warnings().is_empty());
    assert_eq!(reopened.list(), monitor.list());
    assert_eq!(reopened.get(&changed).unwrap().status, Status::Modified);
    assert!(reopened.get(&dropped).is_none());
}

#[test]
fn corrupt_database_opens_empty_with_warning() {
    let dir = tempdir().unwrap();
    let db = write(dir.path(), "integrity_database.json", b"[1, 2,");
    let monitor = Monitor::open_at(&db);
    assert!(monitor.is_empty());
    assert_eq!(monitor.load_warnings().len(), 1);
}

// ─── Test 8: Bulk checks ────────────────────────────────────────────────────

#[test]
fn parallel_check_matches_sequential() {
    let dir = tempdir().unwrap();
    let config = MonitorConfig {
        database_path: dir.path().join("db.json"),
        jobs: 1,
        ..MonitorConfig::default()
    };
    let monitor = Monitor::open(config);

    let mut files = Vec::new();
    for i in 0..12 {
        let file = write(dir.path(), &format!("f{i:02}.txt"), format!("content {i}").as_bytes());
        monitor.register(&file, Algorithm::Sha256).unwrap();
        files.push(file);
    }
    fs::write(&files[3], b"changed").unwrap();
    fs::write(&files[8], b"changed too").unwrap();
    fs::remove_file(&files[5]).unwrap();

    let sequential = monitor.check_all().unwrap();
    let parallel = monitor.check_all_parallel(4, &CancelFlag::new()).unwrap();

    assert_eq!(sequential.total(), 12);
    assert_eq!(sequential.modified.len(), 2);
    assert_eq!(sequential.missing.len(), 1);
    assert!(!sequential.is_clean());
    assert_eq!(grouped_paths(&sequential), grouped_paths(&parallel));

    let intact = &grouped_paths(&sequential)[0];
    let mut sorted = intact.clone();
    sorted.sort();
    assert_eq!(intact, &sorted);
}

#[test]
fn cancelled_check_all_reports_cancellation() {
    let (dir, monitor) = setup();
    let file = write(dir.path(), "a.txt", b"x");
    monitor.register(&file, Algorithm::Sha256).unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let summary = monitor.check_all_with(&cancel).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.total(), 0);
}
