//! Error kinds surfaced by the core.
//!
//! Fingerprint failures during verification never escape as errors; they are
//! folded into a per-file `error` status. Registration and persistence errors
//! abort only the operation that raised them.

use crate::models::Algorithm;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("unsupported hash algorithm: {algorithm} (expected md5, sha1, sha256 or sha512)")]
    UnsupportedAlgorithm { algorithm: String },

    #[error("cannot compute {algorithm} fingerprint of {}: {source}", path.display())]
    Read {
        path: PathBuf,
        algorithm: Algorithm,
        #[source]
        source: io::Error,
    },
}

impl FingerprintError {
    pub(crate) fn read(path: &Path, algorithm: Algorithm, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            algorithm,
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("cannot register {}: {reason}", path.display())]
    NotAFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("cannot serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write registry {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Non-fatal problem found while loading the registry. The affected data is
/// dropped and the process continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("registry {}: {reason}", path.display())]
pub struct LoadWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl LoadWarning {
    pub(crate) fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
