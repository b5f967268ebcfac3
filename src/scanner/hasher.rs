//! Streaming content fingerprints.
//!
//! # Overview
//! This module provides the [`Fingerprinter`] struct for computing a
//! cryptographic digest of a byte source in fixed-size blocks, so memory use
//! stays flat regardless of file size. The result is always a lowercase
//! hexadecimal string.
//!
//! Duplicate detection trusts the digest completely: two sources with the
//! same fingerprint are treated as identical content.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::HashError;

/// Size of each block fed into the digest (64 KiB).
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Digest algorithm used for fingerprints.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 (64 hex characters)
    #[default]
    Sha256,
    /// BLAKE3 (64 hex characters)
    Blake3,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

enum DigestState {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, block: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(block),
            Self::Blake3(h) => {
                h.update(block);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Streaming content fingerprinter.
///
/// # Example
///
/// ```
/// use dupescan::scanner::Fingerprinter;
///
/// let fingerprinter = Fingerprinter::default();
/// let digest = fingerprinter.fingerprint_bytes(b"hello").unwrap();
/// assert_eq!(digest.len(), 64);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
}

impl Fingerprinter {
    /// Create a fingerprinter for the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this fingerprinter uses.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Fingerprint everything readable from `reader`.
    ///
    /// Reads in [`BLOCK_SIZE`] blocks until the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Read`] on the first I/O error. There is no retry.
    pub fn fingerprint_reader<R: Read>(&self, mut reader: R) -> Result<String, HashError> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; BLOCK_SIZE];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::Read(e)),
            }
        }

        Ok(state.finalize_hex())
    }

    /// Fingerprint an in-memory buffer.
    ///
    /// # Errors
    ///
    /// Reading from a slice cannot fail; the `Result` mirrors the reader API.
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Result<String, HashError> {
        self.fingerprint_reader(bytes)
    }

    /// Fingerprint a file on disk.
    ///
    /// Returns the digest together with the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - [`HashError::PermissionDenied`] if the file cannot be opened for reading
    /// - [`HashError::NotFound`] if the file vanished since enumeration
    /// - [`HashError::Io`] for any other open or read failure
    pub fn fingerprint_file(&self, path: &Path) -> Result<(String, u64), HashError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let mut counter = CountingReader::new(file);
        let digest = self
            .fingerprint_reader(&mut counter)
            .map_err(|e| match e {
                HashError::Read(source) => HashError::Io {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })?;

        log::trace!("Fingerprinted {} ({} bytes)", path.display(), counter.bytes);
        Ok((digest, counter.bytes))
    }
}

/// Reader adapter that counts consumed bytes.
struct CountingReader<R> {
    inner: R,
    bytes: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, bytes: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }
}
