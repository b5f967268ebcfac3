//! Scanner module for directory traversal, content fingerprinting and
//! archive expansion.
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and regular-file discovery
//! - [`hasher`]: Streaming content fingerprints (SHA-256 or BLAKE3)
//! - [`archive`]: Fingerprinting of the members of ZIP containers
//!
//! All of them produce or consume [`FileRecord`], the unit the rest of the
//! pipeline passes around.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{FileRecord, Fingerprinter, Walker};
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::default();
//! for entry in Walker::new(Path::new(".")).walk() {
//!     let Ok(path) = entry else { continue };
//!     if let Ok((digest, size)) = fingerprinter.fingerprint_file(&path) {
//!         let record = FileRecord::from_disk(&path, size, digest);
//!         println!("{} {}", record.fingerprint.unwrap_or_default(), record.path);
//!     }
//! }
//! ```

pub mod archive;
pub mod hasher;
pub mod walker;

use std::cmp::Ordering;
use std::hash::{Hash as StdHash, Hasher as StdHasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export main types
pub use archive::{expand_archive, check_archive, ArchiveExpansion};
pub use hasher::{Fingerprinter, HashAlgorithm, BLOCK_SIZE};
pub use walker::Walker;

/// One file's identity and content fingerprint.
///
/// Disk files carry their filesystem path in `path` and no container.
/// Archive members carry the entry name inside the archive in `path` and the
/// archive's disk path in `container_path`.
///
/// Equality, ordering and hashing only look at `path`. Two members with the
/// same entry name in different containers are therefore the same record,
/// and only the first one seen survives grouping. The fingerprint is data,
/// not identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Filesystem path, or the entry name for archive members
    pub path: String,
    /// Size in bytes (uncompressed size for archive members)
    pub size: u64,
    /// Lowercase hex digest of the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Lowercase extension without the leading dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Category assigned by a [`crate::classify::Classifier`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Diagnostic left by the classifier (e.g. a sniffed signature or failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Disk path of the enclosing archive, for archive members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_path: Option<String>,
}

impl FileRecord {
    /// Create a record for a plain file on disk.
    #[must_use]
    pub fn from_disk(path: &Path, size: u64, fingerprint: String) -> Self {
        let display = path.to_string_lossy().into_owned();
        Self {
            extension: extension_of(&display),
            path: display,
            size,
            fingerprint: Some(fingerprint),
            category: None,
            details: None,
            container_path: None,
        }
    }

    /// Create a record for a member of an archive.
    ///
    /// # Arguments
    ///
    /// * `container` - Disk path of the archive
    /// * `entry_name` - Name of the entry inside the archive
    /// * `size` - Uncompressed size of the entry
    /// * `fingerprint` - Digest of the entry content
    #[must_use]
    pub fn from_archive_member(
        container: &Path,
        entry_name: &str,
        size: u64,
        fingerprint: String,
    ) -> Self {
        Self {
            path: entry_name.to_string(),
            size,
            fingerprint: Some(fingerprint),
            extension: extension_of(entry_name),
            category: None,
            details: None,
            container_path: Some(container.to_string_lossy().into_owned()),
        }
    }

    /// Whether this record describes an entry inside an archive.
    #[must_use]
    pub fn is_archive_member(&self) -> bool {
        self.container_path.is_some()
    }

    /// Disk path of the record (the path itself for disk files).
    #[must_use]
    pub fn disk_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// Human-readable location, `container/entry` for archive members.
    #[must_use]
    pub fn display_path(&self) -> String {
        match &self.container_path {
            Some(container) => member_key(container, &self.path),
            None => self.path.clone(),
        }
    }

    fn identity(&self) -> &str {
        self.path.as_str()
    }
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for FileRecord {}

impl PartialOrd for FileRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl StdHash for FileRecord {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Composite key used for archive members in error maps.
#[must_use]
pub fn member_key(container: &str, entry_name: &str) -> String {
    format!("{container}/{entry_name}")
}

/// Lowercase extension of a path or entry name, without the dot.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Errors that can occur during directory enumeration.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The path is not valid UTF-8 and cannot be stored in a checkpoint.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::NonUtf8Path(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur while fingerprinting content.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading from an anonymous byte source failed.
    #[error("Read failure: {0}")]
    Read(#[source] std::io::Error),
}

impl HashError {
    /// Short reason suitable for the scan error map.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound(_) => "File not found".to_string(),
            Self::PermissionDenied(_) => "Permission denied".to_string(),
            Self::Io { source, .. } => format!("Could not calculate hash: {source}"),
            Self::Read(source) => format!("Could not calculate hash: {source}"),
        }
    }
}
