use crate::fingerprint::DEFAULT_CHUNK_SIZE;
use crate::models::Algorithm;
use crate::paths;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE: &str = "integrity_database.json";
pub const DATABASE_ENV: &str = "FIM_DATABASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Registry document location
    pub database_path: PathBuf,
    /// Algorithm used when the caller does not pick one
    pub default_algorithm: Algorithm,
    /// Read size for fingerprinting
    pub chunk_size: usize,
    /// Worker threads for `check_all`; 1 checks sequentially, 0 uses every core
    pub jobs: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            default_algorithm: Algorithm::Sha256,
            chunk_size: DEFAULT_CHUNK_SIZE,
            jobs: 1,
        }
    }
}

impl MonitorConfig {
    /// Read settings from a JSON file; missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Resolve settings: an explicit file must exist; otherwise the per-user
    /// config is used when present. Environment overrides apply last.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => match paths::config_path() {
                Ok(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        self
    }

    #[cfg(test)]
    fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
