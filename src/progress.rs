//! Progress reporting utilities using indicatif.
//!
//! The orchestrator reports through the [`ProgressCallback`] trait; the CLI
//! installs [`Progress`], which renders one bar per cursor-driven phase and a
//! spinner while the disk enumeration is being materialized.
//!
//! Phase names passed to the callback are the lowercase phase names
//! (`scanning_disk`, `classifying`, `scanning_archives`) plus
//! [`ENUMERATING`] for directory walking.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Pseudo-phase reported while the disk work list is being built.
pub const ENUMERATING: &str = "enumerating";

/// Callback trait for scan progress.
///
/// All methods are called from the orchestrator's thread, between work
/// units. Implementations must not block for long.
pub trait ProgressCallback: Send + Sync {
    /// A phase (or enumeration) starts. `total` is the work list length,
    /// or 0 when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Item `current` (1-based, counted from the start of the work list) is
    /// being processed.
    fn on_progress(&self, current: usize, item: &str);

    /// An item finished; `bytes` is the amount of content fingerprinted.
    fn on_item_completed(&self, _bytes: u64) {}

    /// The phase finished or was suspended.
    fn on_phase_end(&self, phase: &str);
}

/// Terminal progress bars.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter. `quiet` suppresses all drawing.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn label(phase: &str) -> &'static str {
        match phase {
            ENUMERATING => "Enumerating files",
            "scanning_disk" => "Fingerprinting",
            "classifying" => "Classifying",
            "scanning_archives" => "Scanning archives",
            _ => "Working",
        }
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == ENUMERATING {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(Self::label(phase));

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, item: &str) {
        if self.quiet {
            return;
        }
        let msg = truncate_path(item, 30);
        self.with_active(|pb| {
            pb.set_position(current as u64);
            pb.set_message(msg);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Ok(mut active) = self.active.lock() {
            if let Some(pb) = active.take() {
                pb.finish_with_message(format!("{} done", Self::label(phase)));
            }
        }
    }
}

/// Shorten a path for display, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
