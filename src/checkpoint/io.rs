//! Durable storage for scan checkpoints.

use crate::checkpoint::data::{ScanState, CHECKPOINT_VERSION};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Envelope for checkpoint files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointEnvelope {
    /// SHA256 checksum of the compact serialized state.
    checksum: String,
    /// The actual scan state.
    state: ScanState,
}

/// Errors from saving or clearing a checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// The state could not be serialized.
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The checkpoint file could not be written, renamed or removed.
    #[error("Checkpoint I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

fn checksum_of(state: &ScanState) -> Result<String, serde_json::Error> {
    // MUST stay the compact form; load re-serializes the same way
    let compact = serde_json::to_string(state)?;
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Single-location checkpoint store.
///
/// One writer per location is assumed; concurrent runs against the same
/// path are last-writer-wins.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file is present (valid or not).
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Serialize the state with an integrity checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Serialize`] if any field cannot be
    /// represented (for example a non UTF-8 path).
    pub fn to_json(state: &ScanState) -> Result<String, CheckpointError> {
        let envelope = CheckpointEnvelope {
            checksum: checksum_of(state)?,
            state: state.clone(),
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Persist `state`, replacing any previous checkpoint.
    ///
    /// The file is written next to the target and renamed over it, so a
    /// crash mid-save leaves the previous checkpoint intact.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] on serialization or I/O failure. Callers
    /// report it and carry on; a lost checkpoint only means a fresh start.
    pub fn save(&self, state: &ScanState) -> Result<(), CheckpointError> {
        let json = Self::to_json(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp_path).map_err(|e| self.io_error(&tmp_path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| self.io_error(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            self.io_error(&self.path, e)
        })?;

        log::info!(
            "Checkpoint saved to {} (phase {})",
            self.path.display(),
            state.phase
        );
        Ok(())
    }

    /// Load the checkpoint.
    ///
    /// Returns `None` when there is no checkpoint, and also when it is
    /// unreadable, corrupted, tampered with or from another format version.
    /// A broken checkpoint must never block a fresh scan.
    #[must_use]
    pub fn load(&self) -> Option<ScanState> {
        if !self.path.exists() {
            log::debug!("No checkpoint at {}", self.path.display());
            return None;
        }

        match self.load_verified() {
            Ok(state) => {
                log::info!(
                    "Checkpoint loaded from {} (phase {})",
                    self.path.display(),
                    state.phase
                );
                Some(state)
            }
            Err(reason) => {
                log::warn!(
                    "Ignoring checkpoint {}: {}",
                    self.path.display(),
                    reason
                );
                None
            }
        }
    }

    fn load_verified(&self) -> Result<ScanState, String> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| format!("failed to read checkpoint: {e}"))?;

        let envelope: CheckpointEnvelope = serde_json::from_str(&content)
            .map_err(|e| format!("failed to parse checkpoint envelope: {e}"))?;

        let calculated = checksum_of(&envelope.state)
            .map_err(|e| format!("failed to re-serialize state: {e}"))?;
        if calculated != envelope.checksum {
            return Err("integrity check failed: checksum mismatch".to_string());
        }

        if envelope.state.version != CHECKPOINT_VERSION {
            return Err(format!(
                "unsupported checkpoint version {} (current {})",
                envelope.state.version, CHECKPOINT_VERSION
            ));
        }

        Ok(envelope.state)
    }

    /// Delete the checkpoint. Deleting a missing checkpoint is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if an existing file cannot be removed.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Checkpoint {} deleted", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Checkpoint {} not found, nothing to delete", self.path.display());
                Ok(())
            }
            Err(e) => Err(self.io_error(&self.path, e)),
        }
    }
}
