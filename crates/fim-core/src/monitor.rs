use crate::cancel::CancelFlag;
use crate::config::MonitorConfig;
use crate::error::{LoadWarning, PersistError, RegistrationError};
use crate::fingerprint::Fingerprinter;
use crate::models::{Algorithm, BulkRegistration, CheckSummary, Record, VerificationResult};
use crate::register::Registrar;
use crate::registry::RegistryStore;
use crate::verify::Verifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Entry point for callers: one registry, shared by registration and
/// verification.
pub struct Monitor {
    config: MonitorConfig,
    store: Arc<RegistryStore>,
    registrar: Registrar,
    verifier: Verifier,
    load_warnings: Vec<LoadWarning>,
}

impl Monitor {
    /// Load the registry named by `config`. Load problems never fail the
    /// open; see [`Monitor::load_warnings`].
    pub fn open(config: MonitorConfig) -> Self {
        let (store, load_warnings) = RegistryStore::open(&config.database_path);
        let store = Arc::new(store);
        let fingerprinter = Fingerprinter::with_chunk_size(config.chunk_size);
        info!(
            database = %config.database_path.display(),
            records = store.len(),
            warnings = load_warnings.len(),
            "monitor opened"
        );
        Self {
            registrar: Registrar::new(store.clone(), fingerprinter.clone()),
            verifier: Verifier::new(store.clone(), fingerprinter),
            store,
            config,
            load_warnings,
        }
    }

    /// Open with default settings and the given database file.
    pub fn open_at(database: impl Into<PathBuf>) -> Self {
        Self::open(MonitorConfig {
            database_path: database.into(),
            ..MonitorConfig::default()
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        self.store.path()
    }

    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }

    pub fn register(&self, path: &Path, algorithm: Algorithm) -> Result<Record, RegistrationError> {
        self.registrar.register(path, algorithm)
    }

    pub fn register_many<I, P>(&self, paths: I, algorithm: Algorithm) -> BulkRegistration
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.registrar.register_many(paths, algorithm, &CancelFlag::new())
    }

    pub fn register_many_with<I, P>(&self, paths: I, algorithm: Algorithm, cancel: &CancelFlag) -> BulkRegistration
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.registrar.register_many(paths, algorithm, cancel)
    }

    pub fn unregister(&self, path: &Path) -> Result<bool, PersistError> {
        self.registrar.unregister(path)
    }

    pub fn check(&self, path: &Path) -> Result<VerificationResult, PersistError> {
        self.verifier.check(path)
    }

    /// Check every record, in parallel when the configured `jobs` is not 1.
    pub fn check_all(&self) -> Result<CheckSummary, PersistError> {
        self.check_all_with(&CancelFlag::new())
    }

    pub fn check_all_with(&self, cancel: &CancelFlag) -> Result<CheckSummary, PersistError> {
        match self.config.jobs {
            1 => self.verifier.check_all(cancel),
            jobs => self.verifier.check_all_parallel(jobs, cancel),
        }
    }

    pub fn check_all_parallel(&self, jobs: usize, cancel: &CancelFlag) -> Result<CheckSummary, PersistError> {
        self.verifier.check_all_parallel(jobs, cancel)
    }

    /// Every record in path order.
    pub fn list(&self) -> Vec<(String, Record)> {
        self.store.all()
    }

    pub fn get(&self, path: &Path) -> Option<Record> {
        crate::paths::record_key(path).and_then(|key| self.store.get(&key))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
