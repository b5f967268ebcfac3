//! File-type classification.
//!
//! The orchestrator only needs the [`Classifier`] seam: something that looks
//! at a [`FileRecord`] and returns a [`Classification`]. Classifiers never
//! fail; anything they cannot determine becomes [`UNKNOWN_CATEGORY`] with a
//! diagnostic.
//!
//! [`ExtensionClassifier`] is the default: a lowercase extension table, with a
//! short magic-number sniff for files that have no usable extension.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::scanner::FileRecord;

/// Category assigned when nothing better is known.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Category name (e.g. "image", "archive")
    pub category: String,
    /// Optional diagnostic, such as a sniffed signature or a failure reason
    pub details: Option<String>,
}

impl Classification {
    /// Classification with no diagnostic.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            details: None,
        }
    }

    /// The unknown sentinel with a diagnostic.
    #[must_use]
    pub fn unknown(details: impl Into<String>) -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            details: Some(details.into()),
        }
    }

    /// Write this classification into a record.
    pub fn apply_to(self, record: &mut FileRecord) {
        record.category = Some(self.category);
        record.details = self.details;
    }
}

/// Assigns a category to a file record.
///
/// Implementations must be idempotent and must not fail.
pub trait Classifier: Send + Sync {
    /// Classify a record.
    fn classify(&self, record: &FileRecord) -> Classification;
}

/// Extension-table classifier with a magic-number fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionClassifier;

impl ExtensionClassifier {
    /// Category for a lowercase extension without the dot.
    #[must_use]
    pub fn category_for_extension(extension: &str) -> Option<&'static str> {
        let category = match extension {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "webp" | "heic" => "image",
            "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" => "video",
            "mp3" | "wav" | "aac" | "flac" | "ogg" => "audio",
            "doc" | "docx" | "pdf" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx"
            | "md" => "document",
            "zip" | "rar" | "tar" | "gz" | "7z" => "archive",
            "py" | "js" | "java" | "c" | "cpp" | "cs" | "html" | "css" | "php" | "rb" | "go"
            | "swift" | "kt" | "pl" | "sh" | "rs" => "code",
            "json" | "xml" | "csv" | "yaml" | "yml" | "toml" => "data",
            "exe" => "executable",
            "dll" | "so" | "dylib" => "library",
            "app" => "application",
            _ => return None,
        };
        Some(category)
    }

    /// Category for a known leading byte signature.
    #[must_use]
    pub fn category_for_signature(header: &[u8]) -> Option<(&'static str, &'static str)> {
        const SIGNATURES: &[(&[u8], &str, &str)] = &[
            (b"\x89PNG\r\n\x1a\n", "image", "image/png"),
            (b"\xff\xd8\xff", "image", "image/jpeg"),
            (b"GIF87a", "image", "image/gif"),
            (b"GIF89a", "image", "image/gif"),
            (b"%PDF-", "document", "application/pdf"),
            (b"PK\x03\x04", "archive", "application/zip"),
            (b"\x1f\x8b", "archive", "application/gzip"),
            (b"\x7fELF", "executable", "application/x-elf"),
        ];

        SIGNATURES
            .iter()
            .find(|(magic, _, _)| header.starts_with(magic))
            .map(|(_, category, mime)| (*category, *mime))
    }

    fn sniff(path: &Path) -> Classification {
        let mut header = [0u8; 16];
        let read = File::open(path).and_then(|mut f| f.read(&mut header));

        match read {
            Ok(n) => match Self::category_for_signature(&header[..n]) {
                Some((category, mime)) => Classification {
                    category: category.to_string(),
                    details: Some(mime.to_string()),
                },
                None => Classification::unknown("No known signature"),
            },
            Err(e) => Classification::unknown(format!("File not accessible: {e}")),
        }
    }
}

impl Classifier for ExtensionClassifier {
    fn classify(&self, record: &FileRecord) -> Classification {
        if let Some(category) = record
            .extension
            .as_deref()
            .and_then(Self::category_for_extension)
        {
            return Classification::new(category);
        }

        // Archive members have no disk path to sniff
        if record.is_archive_member() {
            return Classification::unknown("Unrecognised extension inside archive");
        }

        Self::sniff(&record.disk_path())
    }
}
