// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Run coordinator
//!
//! Owns the run registry and drives one [`Run`] per discovered repository,
//! in discovery order. Each run reads the staged diff, checks it against the
//! token ceiling, resolves credentials and the prompt, and streams the
//! generated message into the repository's sink.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigSource, Settings};
use crate::error::QuillError;
use crate::llm::{estimate_tokens, ChatClient, CompletionRequest};
use crate::vcs::{RepositoryHandle, VersionControl};

use super::observer::{NoopObserver, RunObserver};
use super::registry::RunRegistry;
use super::retry::RetryConfig;
use super::run::{Run, RunOutcome};

/// Knobs the coordinator takes from settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Admission ceiling on the estimated diff size
    pub max_tokens: u32,
    /// Start the message with `Auto-generated commit (<branch>)`
    pub branch_header: bool,
    pub retry: RetryConfig,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for GenerationOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_tokens: settings.generation.max_tokens,
            branch_header: settings.generation.branch_header,
            retry: RetryConfig::from(&settings.resilience),
        }
    }
}

/// Outcome of one repository's run.
#[derive(Debug)]
pub struct RunReport {
    pub repo: RepositoryHandle,
    pub outcome: RunOutcome,
}

/// Outcome of one generate invocation.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Another invocation holds the registry; nothing was done
    AlreadyRunning,
    /// Every discovered repository was visited
    Completed(Vec<RunReport>),
    /// Repositories could not be listed
    Failed(QuillError),
}

impl CommandOutcome {
    /// Whether the invocation should be reported as a failure.
    pub fn has_failures(&self) -> bool {
        match self {
            CommandOutcome::AlreadyRunning => false,
            CommandOutcome::Completed(reports) => reports.iter().any(|r| r.outcome.is_failure()),
            CommandOutcome::Failed(_) => true,
        }
    }
}

/// Drives generation across the workspace.
pub struct RunCoordinator {
    client: Arc<dyn ChatClient>,
    vcs: Arc<dyn VersionControl>,
    config: Arc<dyn ConfigSource>,
    observer: Arc<dyn RunObserver>,
    options: GenerationOptions,
    registry: RunRegistry,
}

impl RunCoordinator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        vcs: Arc<dyn VersionControl>,
        config: Arc<dyn ConfigSource>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            client,
            vcs,
            config,
            observer: Arc::new(NoopObserver),
            options,
            registry: RunRegistry::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Generate a message for every repository.
    ///
    /// Returns [`CommandOutcome::AlreadyRunning`] immediately if another
    /// invocation is in progress. Each run gets a child of `cancel`, so
    /// cancelling it stops the current run and skips the rest.
    pub async fn generate(&self, cancel: CancellationToken) -> CommandOutcome {
        let Some(_slot) = self.registry.try_acquire() else {
            tracing::info!(target: "quill.coordinator", "generation already in progress");
            self.observer.on_already_running();
            return CommandOutcome::AlreadyRunning;
        };

        let repos = match self.vcs.list_repositories().await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::error!(target: "quill.coordinator", error = %e, "could not list repositories");
                self.observer.on_discovery_failed(&e);
                return CommandOutcome::Failed(e);
            }
        };
        tracing::debug!(target: "quill.coordinator", count = repos.len(), "repositories discovered");

        let mut reports = Vec::with_capacity(repos.len());
        for repo in repos {
            let outcome = if cancel.is_cancelled() {
                RunOutcome::Cancelled
            } else {
                self.run_with_notifications(&repo, cancel.child_token()).await
            };
            reports.push(RunReport { repo, outcome });
        }

        CommandOutcome::Completed(reports)
    }

    /// One repository's run, bracketed by observer notifications. Only
    /// reachable from [`generate`](Self::generate), which holds the slot.
    async fn run_with_notifications(
        &self,
        repo: &RepositoryHandle,
        cancel: CancellationToken,
    ) -> RunOutcome {
        self.observer.on_run_started(repo);
        let outcome = self.run_repository(repo, cancel).await;
        self.observer.on_run_finished(repo, &outcome);
        outcome
    }

    async fn run_repository(&self, repo: &RepositoryHandle, cancel: CancellationToken) -> RunOutcome {
        let mut run = Run::new(repo.clone(), cancel);
        tracing::debug!(target: "quill.coordinator", run_id = %run.id(), repo = %repo, "run pending");

        let diff = match self.vcs.staged_diff(repo).await {
            Ok(diff) => diff,
            Err(e) => return run.finish(RunOutcome::Failed(e)),
        };
        if diff.trim().is_empty() {
            return run.finish(RunOutcome::NoChanges);
        }

        let estimated = estimate_tokens(&diff);
        if estimated > self.options.max_tokens {
            return run.finish(RunOutcome::Failed(QuillError::QuotaExceeded {
                estimated,
                limit: self.options.max_tokens,
            }));
        }

        // A prompt abandoned by Ctrl+C is a cancellation, not missing config.
        let credentials = match self.config.credentials().await {
            Ok(credentials) => credentials,
            Err(_) if run.is_cancelled() => return run.finish(RunOutcome::Cancelled),
            Err(e) => return run.finish(RunOutcome::Failed(e)),
        };
        let template = match self.config.prompt_template().await {
            Ok(template) => template,
            Err(_) if run.is_cancelled() => return run.finish(RunOutcome::Cancelled),
            Err(e) => return run.finish(RunOutcome::Failed(e)),
        };

        if self.options.branch_header {
            match self.vcs.current_branch(repo).await {
                Ok(Some(branch)) => {
                    run = run.with_preamble(format!("Auto-generated commit ({})\n\n", branch));
                }
                Ok(None) => {
                    tracing::debug!(target: "quill.coordinator", repo = %repo, "no branch checked out, header skipped");
                }
                Err(e) => return run.finish(RunOutcome::Failed(e)),
            }
        }

        let mut sink = match self.vcs.commit_message(repo) {
            Ok(sink) => sink,
            Err(e) => return run.finish(RunOutcome::Failed(e)),
        };

        let request = CompletionRequest::new(template, diff);
        run.execute(
            self.client.as_ref(),
            &request,
            &credentials,
            sink.as_mut(),
            &self.options.retry,
            self.observer.as_ref(),
        )
        .await
    }
}
