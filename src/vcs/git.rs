// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Git workspace backed by libgit2.

use async_trait::async_trait;
use git2::{DiffFormat, DiffOptions, ErrorCode, Repository};
use std::path::{Path, PathBuf};

use crate::error::{QuillError, Result};
use crate::sink::{CommitMessageSink, FileSink, TeeSink, TerminalSink};

use super::{RepositoryHandle, VersionControl};

/// File inside the git directory that receives the generated message.
pub const MESSAGE_FILE: &str = "QUILL_EDITMSG";

/// Repositories discovered from a list of workspace roots.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    roots: Vec<PathBuf>,
    echo: bool,
    write_message_file: bool,
}

impl GitWorkspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            echo: true,
            write_message_file: true,
        }
    }

    /// Print fragments to stdout as they stream in.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Keep the message in `<gitdir>/QUILL_EDITMSG`.
    pub fn with_message_file(mut self, write: bool) -> Self {
        self.write_message_file = write;
        self
    }

    fn open(repo: &RepositoryHandle) -> Result<Repository> {
        Repository::open(repo.root()).map_err(|e| {
            QuillError::NoRepository(format!("{}: {}", repo.root().display(), e.message()))
        })
    }

    /// Path of the message file for `repo`.
    pub fn message_file(repo: &RepositoryHandle) -> Result<PathBuf> {
        Ok(Self::open(repo)?.path().join(MESSAGE_FILE))
    }
}

fn discover_root(path: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(path).map_err(|e| {
        QuillError::NoRepository(format!("{}: {}", path.display(), e.message()))
    })?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| QuillError::NoRepository("Bare repositories not supported".into()))?;
    Ok(workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf()))
}

#[async_trait]
impl VersionControl for GitWorkspace {
    async fn list_repositories(&self) -> Result<Vec<RepositoryHandle>> {
        let mut found: Vec<RepositoryHandle> = Vec::new();
        let mut last_error = None;

        for root in &self.roots {
            match discover_root(root) {
                Ok(workdir) => {
                    let handle = RepositoryHandle::new(workdir);
                    if !found.contains(&handle) {
                        tracing::debug!(target: "quill.vcs", repo = %handle.root().display(), "discovered repository");
                        found.push(handle);
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "quill.vcs", root = %root.display(), error = %e, "skipping workspace root");
                    last_error = Some(e);
                }
            }
        }

        match (found.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            (true, None) => Err(QuillError::NoRepository("no workspace roots given".into())),
            _ => Ok(found),
        }
    }

    async fn staged_diff(&self, repo: &RepositoryHandle) -> Result<String> {
        let git = Self::open(repo)?;

        // Unborn HEAD: everything in the index is new.
        let head_tree = match git.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };

        let mut options = DiffOptions::new();
        let diff = git.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut options))?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(patch)
    }

    async fn current_branch(&self, repo: &RepositoryHandle) -> Result<Option<String>> {
        let git = Self::open(repo)?;
        let branch = match git.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None), // detached
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = git.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .map(|target| target.trim_start_matches("refs/heads/").to_string()))
            }
            Err(e) => Err(e.into()),
        };
        branch
    }

    fn commit_message(&self, repo: &RepositoryHandle) -> Result<Box<dyn CommitMessageSink>> {
        let mut tee = TeeSink::new();
        if self.echo {
            tee = tee.with(TerminalSink::stdout().with_header(format!("── {} ──", repo.name())));
        }
        if self.write_message_file {
            tee = tee.with(FileSink::new(Self::message_file(repo)?));
        }
        Ok(Box::new(tee))
    }
}
