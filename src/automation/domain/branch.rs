//! Point-in-time branch summaries used as AI generation context.

use super::BranchName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Summary of a branch's head commit and accumulated diff statistics.
///
/// Snapshots are read fresh for every pull request creation and are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    name: BranchName,
    head_commit: String,
    commit_message: String,
    author: String,
    changed_files: BTreeSet<String>,
    additions: u64,
    deletions: u64,
}

impl BranchSnapshot {
    /// Creates a snapshot with no recorded file changes.
    #[must_use]
    pub fn new(
        name: BranchName,
        head_commit: impl Into<String>,
        commit_message: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            name,
            head_commit: head_commit.into(),
            commit_message: commit_message.into(),
            author: author.into(),
            changed_files: BTreeSet::new(),
            additions: 0,
            deletions: 0,
        }
    }

    /// Records changed file paths. Duplicate paths collapse.
    #[must_use]
    pub fn with_changed_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.changed_files.extend(files);
        self
    }

    /// Sets the total added and removed line counts.
    #[must_use]
    pub const fn with_line_counts(mut self, additions: u64, deletions: u64) -> Self {
        self.additions = additions;
        self.deletions = deletions;
        self
    }

    /// Returns the branch name.
    #[must_use]
    pub const fn name(&self) -> &BranchName {
        &self.name
    }

    /// Returns the head commit identifier.
    #[must_use]
    pub fn head_commit(&self) -> &str {
        &self.head_commit
    }

    /// Returns the head commit message.
    #[must_use]
    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Returns the head commit author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the set of changed file paths.
    #[must_use]
    pub const fn changed_files(&self) -> &BTreeSet<String> {
        &self.changed_files
    }

    /// Returns the total number of added lines.
    #[must_use]
    pub const fn additions(&self) -> u64 {
        self.additions
    }

    /// Returns the total number of removed lines.
    #[must_use]
    pub const fn deletions(&self) -> u64 {
        self.deletions
    }
}
