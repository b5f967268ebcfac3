//! Checkpoint module for suspending and resuming scans.
//!
//! A scan interrupted by the user (or by a fatal error) writes its whole
//! [`ScanState`] to disk; the next run with `--resume` reads it back and
//! continues from the recorded phase and cursor.
//!
//! # Features
//!
//! * **Integrity**: Each checkpoint is wrapped in an envelope with a SHA256 checksum.
//! * **Versioning**: The state carries a format version; mismatches load as absent.
//! * **Atomic replace**: Saves go to a temp file that is renamed into place.
//!
//! # Architecture
//!
//! * [`data`]: The serializable scan state and phase machine tags.
//! * [`io`]: Saving, loading, verifying and deleting checkpoint files.

pub mod data;
pub mod io;

pub use data::{
    ArchiveScanProgress, ClassifyProgress, DiskScanProgress, Phase, ScanParameters, ScanState,
    StateViolation, CHECKPOINT_VERSION,
};
pub use io::{CheckpointError, CheckpointStore};
