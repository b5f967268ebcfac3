//! Duplicate grouping by content fingerprint.
//!
//! # Overview
//!
//! [`index_duplicates`] buckets records by fingerprint, collapses repeated
//! identities inside each bucket, and emits a [`DuplicateGroup`] for every
//! bucket that still holds two or more distinct files. Records without a
//! fingerprint never participate.
//!
//! The function is pure: the same input always yields the same groups, in
//! ascending fingerprint order.
//!
//! # Example
//!
//! ```
//! use dupescan::duplicates::index_duplicates;
//! use dupescan::scanner::FileRecord;
//! use std::path::Path;
//!
//! let records = vec![
//!     FileRecord::from_disk(Path::new("/a"), 3, "h1".into()),
//!     FileRecord::from_disk(Path::new("/b"), 3, "h2".into()),
//!     FileRecord::from_disk(Path::new("/c"), 3, "h1".into()),
//! ];
//!
//! let (groups, stats) = index_duplicates(&records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].key, "h1");
//! assert_eq!(stats.duplicate_groups, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::scanner::FileRecord;

/// Confirmed group of files sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Shared fingerprint (the group's identity)
    pub key: String,
    /// Distinct members, ordered by identity
    pub members: BTreeSet<FileRecord>,
}

impl DuplicateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|f| f.size).sum()
    }

    /// Space reclaimable by keeping only the smallest member.
    #[must_use]
    pub fn reclaimable_size(&self) -> u64 {
        let keeper = self.members.iter().map(|f| f.size).min().unwrap_or(0);
        self.total_size().saturating_sub(keeper)
    }

    /// Number of duplicate copies (total - 1 keeper).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Display paths of the members (`container/entry` for archive members).
    #[must_use]
    pub fn display_paths(&self) -> Vec<String> {
        self.members.iter().map(FileRecord::display_path).collect()
    }
}

/// Statistics from a grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records received
    pub input_records: usize,
    /// Records skipped for lacking a fingerprint
    pub unfingerprinted: usize,
    /// Repeated identities collapsed inside buckets
    pub collapsed_identities: usize,
    /// Distinct fingerprints seen
    pub unique_fingerprints: usize,
    /// Groups emitted
    pub duplicate_groups: usize,
    /// Files across all emitted groups
    pub duplicate_files: usize,
}

/// Group records by fingerprint.
///
/// # Returns
///
/// A tuple of:
/// - `Vec<DuplicateGroup>` - Groups with 2+ distinct members, sorted by key
/// - `GroupingStats` - Statistics about the grouping operation
#[must_use]
pub fn index_duplicates<'a, I>(records: I) -> (Vec<DuplicateGroup>, GroupingStats)
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut stats = GroupingStats::default();
    let mut buckets: BTreeMap<&str, BTreeSet<FileRecord>> = BTreeMap::new();

    for record in records {
        stats.input_records += 1;

        let Some(fingerprint) = record.fingerprint.as_deref() else {
            stats.unfingerprinted += 1;
            continue;
        };

        if !buckets.entry(fingerprint).or_default().insert(record.clone()) {
            stats.collapsed_identities += 1;
        }
    }

    stats.unique_fingerprints = buckets.len();

    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, members)| DuplicateGroup {
            key: key.to_string(),
            members,
        })
        .collect();

    stats.duplicate_groups = groups.len();
    stats.duplicate_files = groups.iter().map(DuplicateGroup::len).sum();

    log::debug!(
        "Indexed {} records into {} fingerprints, {} duplicate groups",
        stats.input_records,
        stats.unique_fingerprints,
        stats.duplicate_groups
    );

    (groups, stats)
}
