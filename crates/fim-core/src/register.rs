//! Registration: adding and removing monitored files.

use crate::cancel::CancelFlag;
use crate::error::{PersistError, RegistrationError};
use crate::fingerprint::Fingerprinter;
use crate::models::{Algorithm, BulkRegistration, Record, Status};
use crate::paths;
use crate::registry::RegistryStore;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

pub struct Registrar {
    store: Arc<RegistryStore>,
    fingerprinter: Fingerprinter,
}

impl Registrar {
    pub fn new(store: Arc<RegistryStore>, fingerprinter: Fingerprinter) -> Self {
        Self { store, fingerprinter }
    }

    /// Fingerprint `path` and store a fresh `intact` record for it, replacing
    /// any previous record.
    pub fn register(&self, path: &Path, algorithm: Algorithm) -> Result<Record, RegistrationError> {
        let not_a_file = |reason: String| RegistrationError::NotAFile {
            path: path.to_path_buf(),
            reason,
        };
        let metadata = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(not_a_file("not a regular file".into())),
            Err(e) => return Err(not_a_file(e.to_string())),
        };
        let canonical = path.canonicalize().map_err(|e| not_a_file(e.to_string()))?;
        // Record keys are strings; a lossy key would never resolve back to the file.
        let Some(key) = canonical.to_str() else {
            return Err(not_a_file("path is not valid UTF-8".into()));
        };
        let fingerprint = self.fingerprinter.fingerprint(&canonical, algorithm)?;

        let now = Utc::now();
        let record = Record {
            path: key.to_string(),
            fingerprint,
            algorithm,
            size: metadata.len(),
            modified_time: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            created_at: now,
            last_checked_at: now,
            status: Status::Intact,
            previous_fingerprint: None,
            current_fingerprint: None,
        };

        let replaced = self.store.contains(&record.path);
        self.store.put(record.clone())?;
        info!(
            path = %record.path,
            algorithm = %algorithm,
            fingerprint = %record.fingerprint,
            replaced,
            "file registered"
        );
        Ok(record)
    }

    /// Remove `path` from monitoring. `Ok(false)` means it was not registered.
    pub fn unregister(&self, path: &Path) -> Result<bool, PersistError> {
        let Some(key) = paths::record_key(path) else {
            debug!(path = %path.display(), "unregister: not a valid record key");
            return Ok(false);
        };
        let removed = self.store.delete(&key)?;
        if removed {
            info!(path = %key, "file unregistered");
        } else {
            debug!(path = %key, "unregister: not monitored");
        }
        Ok(removed)
    }

    /// Register every candidate, continuing past individual failures.
    /// Cancellation is honoured between files.
    pub fn register_many<I, P>(&self, paths: I, algorithm: Algorithm, cancel: &CancelFlag) -> BulkRegistration
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut outcome = BulkRegistration::default();
        for candidate in paths {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let candidate: PathBuf = candidate.into();
            match self.register(&candidate, algorithm) {
                Ok(_) => outcome.registered += 1,
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "registration failed");
                    outcome.failures.push((candidate, e));
                }
            }
        }
        info!(
            registered = outcome.registered,
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "bulk registration finished"
        );
        outcome
    }
}
