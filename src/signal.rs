//! Cooperative cancellation.
//!
//! A [`CancelToken`] is an externally triggerable flag that the orchestrator
//! polls between work units. Ctrl+C (and SIGTERM on Unix) set it through
//! [`install_handler`]; tests and embedders set it with [`CancelToken::cancel`].
//!
//! Cancelling never discards accumulated results. The current unit finishes,
//! the orchestrator saves a checkpoint, and the run reports itself paused.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! while !token.is_cancelled() {
//!     // process one unit of work
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag.
///
/// Clones share the same flag, so a token handed to the orchestrator is
/// cancelled by any other clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the token can drive another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handling operations.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the signal handler
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

// ctrlc allows one handler per process
static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install the Ctrl+C / SIGTERM handler and return its token.
///
/// Calling this again returns the same token, reset to not-cancelled.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the process-wide handler cannot
/// be registered.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let handler_token = token.clone();

    ctrlc::set_handler(move || {
        handler_token.cancel();

        // Write directly to stderr so the message shows even with progress bars
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Saving checkpoint after the current item..."
        );
        let _ = std::io::stderr().flush();

        log::info!("Cancellation requested by signal");
    })?;

    let _ = GLOBAL_TOKEN.set(token.clone());
    log::debug!("Signal handler installed");
    Ok(token)
}
