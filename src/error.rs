//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the DupeScan application.
///
/// - 0: Success (scan completed, report written)
/// - 0: Paused (scan cancelled, checkpoint saved; pausing is not a failure)
/// - 1: General error (phase-fatal error, bad arguments, unreadable root)
///
/// The two zero codes are told apart by their machine-readable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed and the report was written.
    Success,
    /// Scan was cancelled and checkpointed.
    Paused,
    /// An unexpected error occurred.
    GeneralError,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success | Self::Paused => 0,
            Self::GeneralError => 1,
        }
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DS000",
            Self::GeneralError => "DS001",
            Self::Paused => "DS010",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
