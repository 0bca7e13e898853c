//! fim-core: file integrity monitoring engine
//!
//! Registered files are fingerprinted once; every later check recomputes the
//! fingerprint and classifies the file as intact, modified, missing or
//! erroring. The registry is a single JSON document replaced atomically on
//! every mutation.
//!
//! # Module layout
//! - `fingerprint`: streaming md5/sha1/sha256/sha512 digests
//! - `registry`:    durable path → record store
//! - `register`:    adding and removing monitored files
//! - `verify`:      status transitions and bulk checks
//! - `monitor`:     facade owning the shared store
//! - `config`:      settings file and environment overrides

pub mod cancel;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod monitor;
pub mod paths;
pub mod register;
pub mod registry;
pub mod verify;

pub use cancel::CancelFlag;
pub use config::MonitorConfig;
pub use error::{FingerprintError, LoadWarning, PersistError, RegistrationError};
pub use fingerprint::{fingerprint, fingerprint_bytes, Fingerprinter};
pub use models::{Algorithm, BulkRegistration, CheckSummary, Record, Status, VerificationResult};
pub use monitor::Monitor;
