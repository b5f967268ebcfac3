//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`<config dir>/config.toml`, or the `--config` path)
//! 3. `DUPESCAN_*` environment variables (`__` separates nested keys)
//! 4. CLI flags, merged with [`Config::merge_scan_args`]
//!
//! # Example
//!
//! ```toml
//! algorithm = "blake3"
//! archive_extensions = ["zip", "jar"]
//! report_format = "csv"
//! progress = false
//! checkpoint_path = "/var/tmp/dupescan.json"
//! ```

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{CheckpointArgs, ScanArgs};
use crate::output::ReportFormat;
use crate::scanner::HashAlgorithm;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPESCAN_";

/// Checkpoint file name used when no data directory is available.
pub const FALLBACK_CHECKPOINT: &str = ".dupescan_checkpoint.json";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the checkpoint lives; `None` means the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_path: Option<PathBuf>,
    /// Fingerprint algorithm for new scans.
    pub algorithm: HashAlgorithm,
    /// Extensions (without dot) of files checked for ZIP content.
    pub archive_extensions: Vec<String>,
    /// Report format.
    pub report_format: ReportFormat,
    /// Whether to draw progress bars.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_path: None,
            algorithm: HashAlgorithm::default(),
            archive_extensions: vec!["zip".to_string()],
            report_format: ReportFormat::default(),
            progress: true,
        }
    }
}

impl Config {
    /// Load configuration from `explicit` or, if `None`, the platform path.
    #[must_use]
    pub fn load(explicit: Option<&Path>) -> Self {
        match explicit.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => Self::load_from_path(path),
            None => Self::extract_or_default(Self::figment_without_file()),
        }
    }

    /// Load configuration from a specific TOML file plus the environment.
    ///
    /// A missing file is not an error. An invalid file (or invalid
    /// environment value) logs a warning and yields the defaults.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        Self::extract_or_default(Self::figment(path.as_ref()))
    }

    /// The layered provider stack for `path`.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn figment_without_file() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract_or_default(figment: Figment) -> Self {
        match figment.extract::<Self>() {
            Ok(config) => config.normalized(),
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Lowercase archive extensions and strip leading dots.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.archive_extensions = self
            .archive_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self.archive_extensions.sort();
        self.archive_extensions.dedup();
        self
    }

    /// Apply `scan` flags over the loaded configuration.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        if let Some(path) = &args.checkpoint {
            self.checkpoint_path = Some(path.clone());
        }
        if let Some(algorithm) = args.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(format) = args.format {
            self.report_format = format;
        }
        if args.no_progress {
            self.progress = false;
        }
    }

    /// Apply `status`/`clear` flags over the loaded configuration.
    pub fn merge_checkpoint_args(&mut self, args: &CheckpointArgs) {
        if let Some(path) = &args.checkpoint {
            self.checkpoint_path = Some(path.clone());
        }
    }

    /// Resolved checkpoint location.
    #[must_use]
    pub fn checkpoint_location(&self) -> PathBuf {
        self.checkpoint_path
            .clone()
            .unwrap_or_else(default_checkpoint_path)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "dupescan", "dupescan")
}

/// Platform configuration file path, if the platform has one.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Platform checkpoint path, falling back to the working directory.
#[must_use]
pub fn default_checkpoint_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(FALLBACK_CHECKPOINT),
        |dirs| dirs.data_dir().join("checkpoint.json"),
    )
}
