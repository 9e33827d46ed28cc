// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Version-control collaborator
//!
//! Discovers repositories, reads their staged diff and branch, and hands out
//! the commit-message sink a run writes into.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::sink::CommitMessageSink;

pub mod git;
pub mod memory;

pub use git::GitWorkspace;
pub use memory::InMemoryVcs;

/// Identity of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryHandle {
    root: PathBuf,
    name: String,
}

impl RepositoryHandle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { root, name }
    }

    /// Working-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Short display name (last path component).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Operations the generator needs from version control.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Repositories in the workspace, in a stable order.
    async fn list_repositories(&self) -> Result<Vec<RepositoryHandle>>;

    /// Staged changes as a unified diff; empty when nothing is staged.
    async fn staged_diff(&self, repo: &RepositoryHandle) -> Result<String>;

    /// Checked-out branch, if any.
    async fn current_branch(&self, repo: &RepositoryHandle) -> Result<Option<String>>;

    /// Commit-message sink for `repo`.
    fn commit_message(&self, repo: &RepositoryHandle) -> Result<Box<dyn CommitMessageSink>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_name_is_last_component() {
        let handle = RepositoryHandle::new("/work/projects/quill");
        assert_eq!(handle.name(), "quill");
        assert_eq!(handle.to_string(), "quill");
        assert_eq!(handle.root(), Path::new("/work/projects/quill"));
    }

    #[test]
    fn test_handle_name_falls_back_to_path() {
        let handle = RepositoryHandle::new("/");
        assert_eq!(handle.name(), "/");
    }
}
