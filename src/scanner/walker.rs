//! Directory walker for regular-file discovery.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for enumerating every regular
//! file under a root directory. It uses [`walkdir`] in single-threaded mode
//! with entries sorted by file name, so two walks of an unchanged tree agree.
//!
//! Symbolic links are never followed and never yielded, not even as errors.
//! Files whose path is not valid UTF-8 are yielded as
//! [`ScanError::NonUtf8Path`] so that every listed path can be persisted.
//! The iterator is one-shot: callers that need the list across a resumable
//! boundary must collect it first.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"));
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::ScanError;

/// Directory walker yielding paths of regular files.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            root: path.to_path_buf(),
        }
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`], [`ScanError::NotADirectory`],
    /// [`ScanError::PermissionDenied`] or [`ScanError::NonUtf8Path`]
    /// describing why the root is unusable.
    pub fn check_root(&self) -> Result<(), ScanError> {
        if self.root.to_str().is_none() {
            return Err(ScanError::NonUtf8Path(self.root.clone()));
        }
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(self.handle_io_error(&self.root, e)),
        }
    }

    /// Walk the directory tree, yielding absolute paths of regular files.
    ///
    /// Errors for unreadable directories are yielded as [`ScanError`] values
    /// rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());

        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();

                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }

                    // Directories, sockets, fifos and devices are not content
                    if !file_type.is_file() {
                        return None;
                    }

                    if entry.path().to_str().is_none() {
                        log::warn!("Skipping non-UTF-8 path: {}", entry.path().display());
                        return Some(Err(ScanError::NonUtf8Path(entry.into_path())));
                    }

                    Some(Ok(entry.into_path()))
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("Path not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Handle walkdir errors.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.into_io_error() {
            Some(io) => self.handle_io_error(&path, io),
            None => {
                log::warn!("Walker error for {}", path.display());
                ScanError::Io {
                    path,
                    source: std::io::Error::other("directory traversal failed"),
                }
            }
        }
    }
}
