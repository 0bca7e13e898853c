//! Verification engine.
//!
//! Each check re-fingerprints a registered file and drives its status:
//!
//! ```text
//!   not registered ──────────────────────────────► unknown (nothing stored)
//!   file gone ───────────────────────────────────► missing
//!   fingerprint fails ───────────────────────────► error   (record untouched)
//!   fingerprint == baseline ─────────────────────► intact  (mismatch cleared)
//!   fingerprint != baseline ─────────────────────► modified (baseline kept)
//! ```
//!
//! Fingerprinting happens outside the registry lock. The record is re-read
//! under the lock before the transition is applied, and the registry is saved
//! before the lock is released.

use crate::cancel::CancelFlag;
use crate::error::{FingerprintError, PersistError};
use crate::fingerprint::Fingerprinter;
use crate::models::{CheckSummary, Record, Status, VerificationResult};
use crate::paths;
use crate::registry::RegistryStore;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the filesystem showed for a record's path.
#[derive(Debug)]
pub(crate) enum Observation {
    Missing,
    Failed(FingerprintError),
    Fingerprint { value: String, size: Option<u64> },
}

pub struct Verifier {
    store: Arc<RegistryStore>,
    fingerprinter: Fingerprinter,
}

impl Verifier {
    pub fn new(store: Arc<RegistryStore>, fingerprinter: Fingerprinter) -> Self {
        Self { store, fingerprinter }
    }

    /// Check one path. The result is only returned once any record update
    /// has been persisted.
    pub fn check(&self, path: &Path) -> Result<VerificationResult, PersistError> {
        let Some(key) = paths::record_key(path) else {
            return Ok(VerificationResult::unknown(&path.to_string_lossy()));
        };
        let (result, persisted) = self.check_key(&key);
        persisted.map(|()| result)
    }

    /// Check every record in registry order.
    pub fn check_all(&self, cancel: &CancelFlag) -> Result<CheckSummary, PersistError> {
        let keys = self.store.keys();
        info!(files = keys.len(), "verifying registered files");

        let mut outcomes = Vec::with_capacity(keys.len());
        for key in &keys {
            if cancel.is_cancelled() {
                outcomes.push(None);
                break;
            }
            outcomes.push(Some(self.check_key(key)));
        }
        self.summarize(outcomes)
    }

    /// Like `check_all`, fingerprinting on `jobs` worker threads (0 = one per
    /// core). Record updates still go through the store's writer lock one at a
    /// time, and grouping keeps registry order.
    pub fn check_all_parallel(&self, jobs: usize, cancel: &CancelFlag) -> Result<CheckSummary, PersistError> {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "cannot start worker pool, checking sequentially");
                return self.check_all(cancel);
            }
        };

        let keys = self.store.keys();
        info!(files = keys.len(), jobs = pool.current_num_threads(), "verifying registered files");

        let outcomes: Vec<_> = pool.install(|| {
            keys.par_iter()
                .map(|key| {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(self.check_key(key))
                    }
                })
                .collect()
        });
        self.summarize(outcomes)
    }

    fn summarize(
        &self,
        outcomes: Vec<Option<(VerificationResult, Result<(), PersistError>)>>,
    ) -> Result<CheckSummary, PersistError> {
        let mut summary = CheckSummary::default();
        let mut unsaved = false;

        for outcome in outcomes {
            let Some((result, persisted)) = outcome else {
                summary.cancelled = true;
                continue;
            };
            if let Err(e) = persisted {
                warn!(path = %result.path, error = %e, "check result not persisted");
                unsaved = true;
            }
            match result.status {
                Status::Intact => summary.intact.push(result),
                Status::Modified => summary.modified.push(result),
                Status::Missing => summary.missing.push(result),
                Status::Error => summary.errors.push(result),
                Status::Unknown => debug!(path = %result.path, "record removed during check"),
            }
        }

        if unsaved {
            self.store.save()?;
        }

        if summary.is_clean() {
            info!(intact = summary.intact.len(), cancelled = summary.cancelled, "verification passed");
        } else {
            warn!(
                intact = summary.intact.len(),
                modified = summary.modified.len(),
                missing = summary.missing.len(),
                errors = summary.errors.len(),
                cancelled = summary.cancelled,
                "INTEGRITY VIOLATION"
            );
        }
        Ok(summary)
    }

    fn check_key(&self, key: &str) -> (VerificationResult, Result<(), PersistError>) {
        let Some(snapshot) = self.store.get(key) else {
            return (VerificationResult::unknown(key), Ok(()));
        };
        let observation = self.observe(&snapshot);

        self.store.apply(|registry| {
            let Some(record) = registry.get_mut(key) else {
                return (VerificationResult::unknown(key), false);
            };
            if !same_baseline(record, &snapshot) {
                debug!(path = key, "record re-registered during check, observation discarded");
                let result = VerificationResult {
                    path: key.to_string(),
                    status: record.status,
                    message: "record re-registered during check".to_string(),
                    record: Some(record.clone()),
                    observed_size: None,
                    error: None,
                };
                return (result, false);
            }
            transition(record, observation, Utc::now())
        })
    }

    fn observe(&self, record: &Record) -> Observation {
        let path = Path::new(&record.path);
        if let Ok(false) = path.try_exists() {
            return Observation::Missing;
        }
        match self.fingerprinter.fingerprint(path, record.algorithm) {
            Ok(value) => Observation::Fingerprint {
                value,
                size: fs::metadata(path).ok().map(|m| m.len()),
            },
            // Removed between the existence probe and the open.
            Err(FingerprintError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Observation::Missing
            }
            Err(e) => Observation::Failed(e),
        }
    }
}

fn same_baseline(current: &Record, snapshot: &Record) -> bool {
    current.fingerprint == snapshot.fingerprint
        && current.algorithm == snapshot.algorithm
        && current.created_at == snapshot.created_at
}

/// Apply one observation to `record`. Returns the result and whether the
/// record changed.
pub(crate) fn transition(
    record: &mut Record,
    observation: Observation,
    now: DateTime<Utc>,
) -> (VerificationResult, bool) {
    let (status, message, observed_size, error, changed) = match observation {
        Observation::Missing => {
            record.status = Status::Missing;
            record.last_checked_at = now;
            record.clear_mismatch();
            warn!(path = %record.path, "monitored file missing");
            (Status::Missing, "file missing".to_string(), None, None, true)
        }
        Observation::Failed(e) => {
            warn!(path = %record.path, error = %e, "cannot verify file");
            let cause = e.to_string();
            (Status::Error, format!("fingerprint failed: {cause}"), None, Some(cause), false)
        }
        Observation::Fingerprint { value, size } if value == record.fingerprint => {
            record.status = Status::Intact;
            record.last_checked_at = now;
            record.clear_mismatch();
            debug!(path = %record.path, "file intact");
            (Status::Intact, "file intact".to_string(), size, None, true)
        }
        Observation::Fingerprint { value, size } => {
            warn!(
                path = %record.path,
                expected = %record.fingerprint,
                actual = %value,
                "FILE MODIFIED"
            );
            record.status = Status::Modified;
            record.last_checked_at = now;
            record.previous_fingerprint = Some(record.fingerprint.clone());
            record.current_fingerprint = Some(value);
            (Status::Modified, "file modified".to_string(), size, None, true)
        }
    };

    let result = VerificationResult {
        path: record.path.clone(),
        status,
        message,
        record: Some(record.clone()),
        observed_size,
        error,
    };
    (result, changed)
}
