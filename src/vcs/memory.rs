// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! In-memory version control for tests and embedding.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{QuillError, Result};
use crate::sink::{CommitMessageSink, MessageBuffer};

use super::{RepositoryHandle, VersionControl};

#[derive(Debug, Clone)]
struct MemoryRepo {
    handle: RepositoryHandle,
    /// `None` simulates a repository that cannot be read
    diff: Option<String>,
    branch: Option<String>,
    message: MessageBuffer,
}

/// Repositories whose diffs and branches are held in memory.
#[derive(Debug, Default)]
pub struct InMemoryVcs {
    repos: Mutex<Vec<MemoryRepo>>,
    diff_reads: AtomicUsize,
}

impl InMemoryVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository with the given staged diff.
    pub fn with_repository(self, name: &str, diff: impl Into<String>) -> Self {
        self.push(name, Some(diff.into()));
        self
    }

    /// Add a repository whose diff cannot be read.
    pub fn with_broken_repository(self, name: &str) -> Self {
        self.push(name, None);
        self
    }

    /// Set the checked-out branch of a repository.
    pub fn with_branch(self, name: &str, branch: &str) -> Self {
        if let Ok(mut repos) = self.repos.lock() {
            if let Some(repo) = repos.iter_mut().find(|r| r.handle.name() == name) {
                repo.branch = Some(branch.to_string());
            }
        }
        self
    }

    fn push(&self, name: &str, diff: Option<String>) {
        if let Ok(mut repos) = self.repos.lock() {
            repos.push(MemoryRepo {
                handle: RepositoryHandle::new(format!("/workspace/{}", name)),
                diff,
                branch: None,
                message: MessageBuffer::new(),
            });
        }
    }

    fn find(&self, repo: &RepositoryHandle) -> Result<MemoryRepo> {
        self.repos
            .lock()
            .ok()
            .and_then(|repos| repos.iter().find(|r| &r.handle == repo).cloned())
            .ok_or_else(|| QuillError::NoRepository(repo.root().display().to_string()))
    }

    /// Current commit message of the named repository.
    pub fn message(&self, name: &str) -> String {
        self.repos
            .lock()
            .ok()
            .and_then(|repos| {
                repos
                    .iter()
                    .find(|r| r.handle.name() == name)
                    .map(|r| r.message.contents())
            })
            .unwrap_or_default()
    }

    /// Number of staged-diff reads so far.
    pub fn diff_reads(&self) -> usize {
        self.diff_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionControl for InMemoryVcs {
    async fn list_repositories(&self) -> Result<Vec<RepositoryHandle>> {
        let repos = self
            .repos
            .lock()
            .map(|repos| repos.iter().map(|r| r.handle.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        if repos.is_empty() {
            return Err(QuillError::NoRepository("workspace has no repositories".into()));
        }
        Ok(repos)
    }

    async fn staged_diff(&self, repo: &RepositoryHandle) -> Result<String> {
        self.diff_reads.fetch_add(1, Ordering::SeqCst);
        self.find(repo)?
            .diff
            .ok_or_else(|| QuillError::NoRepository(format!("{} is unavailable", repo.name())))
    }

    async fn current_branch(&self, repo: &RepositoryHandle) -> Result<Option<String>> {
        Ok(self.find(repo)?.branch)
    }

    fn commit_message(&self, repo: &RepositoryHandle) -> Result<Box<dyn CommitMessageSink>> {
        Ok(Box::new(self.find(repo)?.message))
    }
}
