//! Fingerprinting of ZIP archive members.
//!
//! # Overview
//!
//! [`expand_archive`] opens a ZIP container, reads every non-directory entry
//! fully into memory, fingerprints it and emits a [`FileRecord`] whose
//! `container_path` is the archive's disk path and whose `path` is the entry
//! name.
//!
//! Failures are partial: a broken entry is recorded under
//! `container/entry` and the remaining entries are still processed. A
//! container that does not open at all, or whose directory turns out to be
//! malformed mid-iteration, yields a single error keyed by the container path.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use super::{member_key, FileRecord, Fingerprinter};

/// Result of expanding one archive.
#[derive(Debug, Default)]
pub struct ArchiveExpansion {
    /// Records for every successfully fingerprinted member
    pub records: Vec<FileRecord>,
    /// Failures keyed by container path or `container/entry`
    pub errors: BTreeMap<String, String>,
}

/// Container-level archive failures.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The file could not be opened.
    #[error("Could not open archive: {0}")]
    Open(#[source] std::io::Error),

    /// The file is not a ZIP container.
    #[error("Not a valid ZIP file or corrupted: {0}")]
    NotAnArchive(#[source] ZipError),

    /// The central directory broke while iterating entries.
    #[error("Bad ZIP file (corrupted while reading entries): {0}")]
    Malformed(#[source] ZipError),
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::Open)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| match e {
        ZipError::Io(io) => ArchiveError::Open(io),
        other => ArchiveError::NotAnArchive(other),
    })
}

/// Check whether `path` is a readable ZIP container.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened at all (for example
/// permission denied). A readable file that is not a ZIP returns `Ok(false)`.
pub fn check_archive(path: &Path) -> Result<bool, std::io::Error> {
    match open_archive(path) {
        Ok(_) => Ok(true),
        Err(ArchiveError::Open(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(e),
        Err(ArchiveError::Open(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(e),
        Err(_) => Ok(false),
    }
}

/// Expand an archive into fingerprinted member records.
///
/// # Arguments
///
/// * `container` - Disk path of the archive
/// * `fingerprinter` - Fingerprinter used for every member
#[must_use]
pub fn expand_archive(container: &Path, fingerprinter: &Fingerprinter) -> ArchiveExpansion {
    let mut expansion = ArchiveExpansion::default();
    let container_key = container.to_string_lossy().into_owned();

    let mut archive = match open_archive(container) {
        Ok(archive) => archive,
        Err(e) => {
            log::debug!("Archive {} rejected: {}", container.display(), e);
            expansion.errors.insert(container_key, e.to_string());
            return expansion;
        }
    };

    for index in 0..archive.len() {
        let name_hint = archive
            .name_for_index(index)
            .map_or_else(|| format!("#{index}"), str::to_string);

        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(ZipError::UnsupportedArchive(reason)) => {
                // Encrypted or unsupported compression affects only this entry
                let name = name_hint;
                expansion.errors.insert(
                    member_key(&container_key, &name),
                    format!("Error processing file in archive: {reason}"),
                );
                continue;
            }
            Err(e) => {
                log::warn!(
                    "Archive {} became unreadable at entry {}: {}",
                    container.display(),
                    index,
                    e
                );
                expansion
                    .errors
                    .insert(container_key, ArchiveError::Malformed(e).to_string());
                return expansion;
            }
        };

        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let size = entry.size();
        let mut content = Vec::with_capacity(usize::try_from(size).unwrap_or(0).min(1 << 20));

        if let Err(e) = entry.read_to_end(&mut content) {
            log::debug!("Failed to read {} in {}: {}", name, container.display(), e);
            expansion.errors.insert(
                member_key(&container_key, &name),
                format!("Error processing file in archive: {e}"),
            );
            continue;
        }

        match fingerprinter.fingerprint_bytes(&content) {
            Ok(digest) => expansion
                .records
                .push(FileRecord::from_archive_member(container, &name, size, digest)),
            Err(e) => {
                expansion
                    .errors
                    .insert(member_key(&container_key, &name), e.reason());
            }
        }
    }

    log::debug!(
        "Expanded {}: {} members, {} errors",
        container.display(),
        expansion.records.len(),
        expansion.errors.len()
    );
    expansion
}
