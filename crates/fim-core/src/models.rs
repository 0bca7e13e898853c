//! Data models for the integrity registry.
//!
//! `Record` is the persisted unit; its serde field names match the on-disk
//! layout (`hash`, `added_date`, `last_check`, ...) so existing databases keep
//! loading.

use crate::error::{FingerprintError, RegistrationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ── Enums ───────────────────────────────────────────────────────────────────

/// Digest algorithm used to fingerprint a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
    Sha512,
}

/// Name table used when parsing user or database input.
const ALGORITHM_NAMES: [(&str, Algorithm); 4] = [
    ("md5", Algorithm::Md5),
    ("sha1", Algorithm::Sha1),
    ("sha256", Algorithm::Sha256),
    ("sha512", Algorithm::Sha512),
];

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes; the hex fingerprint is twice as long.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = FingerprintError;

    /// Accepts `sha256`, `SHA256` and `sha-256` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "");
        ALGORITHM_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, algorithm)| *algorithm)
            .ok_or_else(|| FingerprintError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            })
    }
}

/// Verification status of a registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Content matches the baseline
    Intact,
    /// Content differs from the baseline
    Modified,
    /// File no longer exists
    Missing,
    /// Path is not registered
    Unknown,
    /// Fingerprint could not be computed
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intact => "intact",
            Self::Modified => "modified",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Registry record ─────────────────────────────────────────────────────────

/// One monitored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub path: String,
    /// Baseline fingerprint; only re-registration replaces it.
    #[serde(rename = "hash")]
    pub fingerprint: String,
    pub algorithm: Algorithm,
    pub size: u64,
    /// Seconds since the Unix epoch when the baseline was captured.
    #[serde(default)]
    pub modified_time: f64,
    #[serde(rename = "added_date", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_check", with = "timestamp")]
    pub last_checked_at: DateTime<Utc>,
    pub status: Status,
    #[serde(
        rename = "previous_hash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_fingerprint: Option<String>,
    #[serde(
        rename = "current_hash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_fingerprint: Option<String>,
}

impl Record {
    pub(crate) fn clear_mismatch(&mut self) {
        self.previous_fingerprint = None;
        self.current_fingerprint = None;
    }
}

/// Timestamps are written as RFC 3339 UTC. Older databases stored naive local
/// ISO-8601 values (`2025-05-01T10:20:30.123456`); those are read as local time.
pub(crate) mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

// ── Operation results ───────────────────────────────────────────────────────

/// Outcome of checking a single path.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub path: String,
    pub status: Status,
    pub message: String,
    /// Stored record after the check; `None` for unregistered paths.
    pub record: Option<Record>,
    /// Size observed on disk during this check.
    pub observed_size: Option<u64>,
    /// Cause of an `error` status.
    pub error: Option<String>,
}

impl VerificationResult {
    pub(crate) fn unknown(path: &str) -> Self {
        Self {
            path: path.to_string(),
            status: Status::Unknown,
            message: "file is not monitored".to_string(),
            record: None,
            observed_size: None,
            error: None,
        }
    }

    /// Baseline fingerprint when the file was registered.
    pub fn baseline(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.fingerprint.as_str())
    }
}

/// `check_all` outcomes grouped by resulting status, each group in registry
/// order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckSummary {
    pub intact: Vec<VerificationResult>,
    pub modified: Vec<VerificationResult>,
    pub missing: Vec<VerificationResult>,
    pub errors: Vec<VerificationResult>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl CheckSummary {
    pub fn total(&self) -> usize {
        self.intact.len() + self.modified.len() + self.missing.len() + self.errors.len()
    }

    /// True when every checked file verified intact.
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.missing.is_empty() && self.errors.is_empty()
    }

    /// Iterate all results grouped in `intact, modified, missing, error` order.
    pub fn iter(&self) -> impl Iterator<Item = &VerificationResult> {
        self.intact
            .iter()
            .chain(&self.modified)
            .chain(&self.missing)
            .chain(&self.errors)
    }
}

/// Outcome of a bulk registration.
#[derive(Debug, Default)]
pub struct BulkRegistration {
    pub registered: usize,
    pub failures: Vec<(PathBuf, RegistrationError)>,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_parsing_accepts_known_spellings() {
        assert_eq!("sha256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!("SHA-512".parse::<Algorithm>().unwrap(), Algorithm::Sha512);
        assert_eq!(" md5 ".parse::<Algorithm>().unwrap(), Algorithm::Md5);
        assert_eq!("sha1".parse::<Algorithm>().unwrap(), Algorithm::Sha1);
    }

    #[test]
    fn algorithm_parsing_rejects_unknown_names() {
        let err = "crc32".parse::<Algorithm>().unwrap_err();
        match err {
            FingerprintError::UnsupportedAlgorithm { algorithm } => assert_eq!(algorithm, "crc32"),
            other => panic!("unexpected error: {other}"),
        }
        assert!("sha3-256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn record_uses_database_field_names() {
        let now = Utc::now();
        let record = Record {
            path: "/etc/hosts".into(),
            fingerprint: "abc".into(),
            algorithm: Algorithm::Sha1,
            size: 3,
            modified_time: 1.5,
            created_at: now,
            last_checked_at: now,
            status: Status::Intact,
            previous_fingerprint: None,
            current_fingerprint: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["hash"], "abc");
        assert_eq!(value["algorithm"], "sha1");
        assert_eq!(value["status"], "intact");
        assert!(value.get("added_date").is_some());
        assert!(value.get("last_check").is_some());
        assert!(value.get("previous_hash").is_none());
        assert!(value.get("current_hash").is_none());

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn legacy_naive_timestamps_are_accepted() {
        let json = serde_json::json!({
            "path": "/tmp/a.txt",
            "hash": "5d41402abc4b2a76b9719d911017c592",
            "algorithm": "md5",
            "size": 5,
            "modified_time": 1714557630.25,
            "added_date": "2025-05-01T10:20:30.123456",
            "last_check": "2025-05-01T10:20:30",
            "status": "modified",
            "previous_hash": "aaa",
            "current_hash": "bbb"
        });
        let record: Record = serde_json::from_value(json).unwrap();
        assert_eq!(record.status, Status::Modified);
        assert_eq!(record.previous_fingerprint.as_deref(), Some("aaa"));
        assert!(record.created_at > record.last_checked_at);
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        assert!(timestamp::parse("yesterday").is_none());
        assert!(timestamp::parse("2025-05-01T10:20:30Z").is_some());
    }
}
