//! Durable path → `Record` registry.
//!
//! The whole registry lives in one pretty-printed JSON document. Saves stage
//! the new document in a temporary file next to the target, fsync it and
//! rename it into place, so a crash mid-write leaves the previous document
//! intact. Every mutation and save runs under one writer lock.

use crate::error::{LoadWarning, PersistError};
use crate::models::Record;
use parking_lot::Mutex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// In-memory registry, iterated in path order.
pub type Registry = BTreeMap<String, Record>;

pub struct RegistryStore {
    path: PathBuf,
    inner: Mutex<Registry>,
}

impl RegistryStore {
    /// Open the store backed by `path`. Load problems are returned as
    /// warnings; the store always opens.
    pub fn open(path: impl AsRef<Path>) -> (Self, Vec<LoadWarning>) {
        let path = path.as_ref().to_path_buf();
        let (registry, warnings) = load(&path);
        (
            Self {
                path,
                inner: Mutex::new(registry),
            },
            warnings,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<(String, Record)> {
        self.inner
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Insert or replace the record under its own path and persist.
    pub fn put(&self, record: Record) -> Result<(), PersistError> {
        let ((), persisted) = self.apply(|registry| {
            registry.insert(record.path.clone(), record);
            ((), true)
        });
        persisted
    }

    /// Remove `key` and persist. Returns whether a record existed; an absent
    /// key does not touch the backing file.
    pub fn delete(&self, key: &str) -> Result<bool, PersistError> {
        let (existed, persisted) = self.apply(|registry| {
            let existed = registry.remove(key).is_some();
            (existed, existed)
        });
        persisted.map(|()| existed)
    }

    /// Run `f` under the writer lock. When `f` reports a change the registry
    /// is saved before the lock is released. The in-memory change is kept
    /// even if the save fails.
    pub fn apply<T, F>(&self, f: F) -> (T, Result<(), PersistError>)
    where
        F: FnOnce(&mut Registry) -> (T, bool),
    {
        let mut registry = self.inner.lock();
        let (value, changed) = f(&mut registry);
        let persisted = if changed {
            write_atomic(&self.path, &registry)
        } else {
            Ok(())
        };
        (value, persisted)
    }

    /// Flush the current in-memory registry.
    pub fn save(&self) -> Result<(), PersistError> {
        let registry = self.inner.lock();
        write_atomic(&self.path, &registry)
    }
}

/// Read the registry at `path`.
///
/// A missing file yields an empty registry. An unreadable or malformed
/// document yields an empty registry and a warning. Entries that fail to
/// decode are skipped individually.
pub fn load(path: &Path) -> (Registry, Vec<LoadWarning>) {
    let mut warnings = Vec::new();
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no registry yet, starting empty");
            return (Registry::new(), warnings);
        }
        Err(e) => {
            warnings.push(LoadWarning::new(path, format!("cannot read: {e}")));
            log_warnings(&warnings);
            return (Registry::new(), warnings);
        }
    };

    let document: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&raw) {
        Ok(document) => document,
        Err(e) => {
            warnings.push(LoadWarning::new(path, format!("not a valid registry document: {e}")));
            log_warnings(&warnings);
            return (Registry::new(), warnings);
        }
    };

    let mut registry = Registry::new();
    for (key, value) in document {
        let record: Record = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warnings.push(LoadWarning::new(path, format!("skipping entry {key}: {e}")));
                continue;
            }
        };
        // Older databases keyed entries by the path as typed; the record's own
        // absolute path is authoritative.
        if record.path != key {
            warnings.push(LoadWarning::new(
                path,
                format!("entry {key} re-keyed to {}", record.path),
            ));
        }
        // The first entry for a path wins.
        match registry.entry(record.path.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(_) => warnings.push(LoadWarning::new(
                path,
                format!("duplicate entry dropped: {key} resolves to already loaded {}", record.path),
            )),
        }
    }

    log_warnings(&warnings);
    debug!(path = %path.display(), entries = registry.len(), "registry loaded");
    (registry, warnings)
}

fn log_warnings(warnings: &[LoadWarning]) {
    for warning in warnings {
        warn!(path = %warning.path.display(), reason = %warning.reason, "registry load warning");
    }
}

fn write_atomic(path: &Path, registry: &Registry) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(registry)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let write_err = |source: io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(&dir).map_err(write_err)?;
    let mut staging = NamedTempFile::new_in(&dir).map_err(write_err)?;
    staging.write_all(&json).map_err(write_err)?;
    staging.as_file().sync_all().map_err(write_err)?;
    staging.persist(path).map_err(|e| write_err(e.error))?;

    if let Err(e) = fsync_dir(&dir) {
        warn!(dir = %dir.display(), error = %e, "cannot fsync registry directory");
    }
    debug!(path = %path.display(), entries = registry.len(), "registry saved");
    Ok(())
}

fn fsync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let dir = OpenOptions::new().read(true).open(path)?;
        dir.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
