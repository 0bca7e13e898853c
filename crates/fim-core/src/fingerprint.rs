//! Streaming file fingerprints.
//!
//! Content is read in fixed-size chunks and fed to the digest for the selected
//! `Algorithm`, so memory use is bounded by the chunk size regardless of file
//! size. A failed read discards the partial digest.

use crate::error::FingerprintError;
use crate::models::Algorithm;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default buffer size for streaming reads (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest accepted read buffer (16MB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// In-progress digest for one of the supported algorithms.
enum DigestState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl DigestState {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Md5 => Self::Md5(Md5::new()),
            Algorithm::Sha1 => Self::Sha1(Sha1::new()),
            Algorithm::Sha256 => Self::Sha256(Sha256::new()),
            Algorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(d) => d.update(data),
            Self::Sha1(d) => d.update(data),
            Self::Sha256(d) => d.update(data),
            Self::Sha512(d) => d.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(d) => hex::encode(d.finalize()),
            Self::Sha1(d) => hex::encode(d.finalize()),
            Self::Sha256(d) => hex::encode(d.finalize()),
            Self::Sha512(d) => hex::encode(d.finalize()),
        }
    }
}

/// File fingerprinter with a configurable read chunk size.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    chunk_size: usize,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// The size is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint the file at `path` as lowercase hex.
    pub fn fingerprint(&self, path: &Path, algorithm: Algorithm) -> Result<String, FingerprintError> {
        let file = File::open(path).map_err(|e| FingerprintError::read(path, algorithm, e))?;
        self.fingerprint_reader(file, algorithm)
            .map_err(|e| FingerprintError::read(path, algorithm, e))
    }

    /// Fingerprint arbitrary streamed content.
    pub fn fingerprint_reader<R: Read>(&self, mut reader: R, algorithm: Algorithm) -> io::Result<String> {
        let mut state = DigestState::new(algorithm);
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(state.finalize_hex())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint a file with the default chunk size.
pub fn fingerprint(path: &Path, algorithm: Algorithm) -> Result<String, FingerprintError> {
    Fingerprinter::new().fingerprint(path, algorithm)
}

/// Fingerprint a file, selecting the algorithm by name. Unknown names are
/// rejected before the file is opened.
pub fn fingerprint_named(path: &Path, algorithm: &str) -> Result<String, FingerprintError> {
    let algorithm: Algorithm = algorithm.parse()?;
    fingerprint(path, algorithm)
}

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(data: &[u8], algorithm: Algorithm) -> String {
    let mut state = DigestState::new(algorithm);
    state.update(data);
    state.finalize_hex()
}
