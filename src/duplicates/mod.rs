//! Duplicate detection module.
//!
//! Groups fingerprinted records into [`DuplicateGroup`]s. See [`groups`].

pub mod groups;

pub use groups::{index_duplicates, DuplicateGroup, GroupingStats};
