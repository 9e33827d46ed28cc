// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! One generation run for one repository
//!
//! A run moves through `Pending -> Requesting -> Streaming` and ends in
//! `Succeeded`, `Cancelled` or `Failed`. A rate-limited attempt loops back
//! to `Requesting` with a fresh decoder; the sink is cleared again once the
//! new request is in flight.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Credentials;
use crate::error::QuillError;
use crate::llm::{ChatClient, CompletionRequest, SseDecoder};
use crate::sink::CommitMessageSink;
use crate::vcs::RepositoryHandle;

use super::observer::RunObserver;
use super::retry::{RetryConfig, RetryController, RetryDecision};

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Requesting,
    Streaming,
    Succeeded,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Message fully streamed into the sink
    Succeeded { attempts: u32, fragments: usize },
    /// Nothing staged; no request was made
    NoChanges,
    /// Stopped at the operator's request
    Cancelled,
    Failed(QuillError),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> RunState {
        match self {
            Self::Succeeded { .. } | Self::NoChanges => RunState::Succeeded,
            Self::Cancelled => RunState::Cancelled,
            Self::Failed(_) => RunState::Failed,
        }
    }

    /// User-facing notice, if this outcome warrants one.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Succeeded { .. } => Some(Notice::success("Commit message generated")),
            Self::NoChanges => Some(Notice::info("No staged changes")),
            Self::Cancelled => None,
            Self::Failed(QuillError::QuotaExceeded { estimated, limit }) => Some(Notice::error(
                format!(
                    "Staged diff is too large (~{} tokens, limit {}); write this message by hand",
                    estimated, limit
                ),
            )),
            Self::Failed(e) => Some(Notice::error(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Status line shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of a single streaming attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Completed { fragments: usize },
    Cancelled,
}

/// State for one repository's run.
pub struct Run {
    id: Uuid,
    repo: RepositoryHandle,
    state: RunState,
    attempt: u32,
    decoder: SseDecoder,
    cancel: CancellationToken,
    preamble: Option<String>,
}

impl Run {
    pub fn new(repo: RepositoryHandle, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo,
            state: RunState::Pending,
            attempt: 0,
            decoder: SseDecoder::new(),
            cancel,
            preamble: None,
        }
    }

    /// Text written right after every clear, ahead of the streamed fragments.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn repo(&self) -> &RepositoryHandle {
        &self.repo
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(
            target: "quill.run",
            run_id = %self.id,
            repo = %self.repo,
            from = ?self.state,
            to = ?next,
            attempt = self.attempt,
            "state change"
        );
        self.state = next;
    }

    /// Record the terminal state and hand the outcome back.
    pub fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.transition(outcome.state());
        match &outcome {
            RunOutcome::Failed(e) => {
                tracing::warn!(target: "quill.run", run_id = %self.id, repo = %self.repo, error = %e, "run failed")
            }
            other => {
                tracing::info!(target: "quill.run", run_id = %self.id, repo = %self.repo, outcome = ?other, "run finished")
            }
        }
        outcome
    }

    /// Run attempts until one succeeds, is cancelled, or fails for good.
    pub async fn execute(
        &mut self,
        client: &dyn ChatClient,
        request: &CompletionRequest,
        credentials: &Credentials,
        sink: &mut dyn CommitMessageSink,
        retry: &RetryConfig,
        observer: &dyn RunObserver,
    ) -> RunOutcome {
        let mut controller = RetryController::new(retry.clone());

        loop {
            self.attempt = controller.attempt();
            match self.stream_once(client, request, credentials, sink).await {
                Ok(AttemptResult::Completed { fragments }) => {
                    return self.finish(RunOutcome::Succeeded {
                        attempts: self.attempt,
                        fragments,
                    });
                }
                Ok(AttemptResult::Cancelled) => return self.finish(RunOutcome::Cancelled),
                Err(error) => {
                    let repo = &self.repo;
                    let decision = controller
                        .after_failure(error, &self.cancel, |attempt, delay| {
                            observer.on_rate_limited(repo, attempt, delay)
                        })
                        .await;
                    match decision {
                        RetryDecision::Retry { .. } => continue,
                        RetryDecision::Cancelled => return self.finish(RunOutcome::Cancelled),
                        RetryDecision::Fail(e) => return self.finish(RunOutcome::Failed(e)),
                    }
                }
            }
        }
    }

    /// One request and its streamed response.
    ///
    /// The cancellation token is checked before the request, raced against
    /// every await, and checked again before each chunk is applied, so no
    /// fragment reaches the sink once cancellation is observed.
    pub async fn stream_once(
        &mut self,
        client: &dyn ChatClient,
        request: &CompletionRequest,
        credentials: &Credentials,
        sink: &mut dyn CommitMessageSink,
    ) -> crate::Result<AttemptResult> {
        self.transition(RunState::Requesting);
        self.decoder.reset();

        if self.cancel.is_cancelled() {
            return Ok(AttemptResult::Cancelled);
        }

        tracing::debug!(
            target: "quill.run",
            run_id = %self.id,
            client = client.name(),
            attempt = self.attempt,
            "sending request"
        );
        let cancel = self.cancel.clone();
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(AttemptResult::Cancelled),
            stream = client.start_stream(request, credentials) => stream?,
        };

        sink.clear()?;
        if let Some(preamble) = &self.preamble {
            sink.append(preamble)?;
        }
        self.transition(RunState::Streaming);

        let mut fragments = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(AttemptResult::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let bytes = chunk?;

            if cancel.is_cancelled() {
                return Ok(AttemptResult::Cancelled);
            }

            let step = self.decoder.feed(&bytes);
            for fragment in &step.fragments {
                sink.append(fragment)?;
                fragments += 1;
            }
            if step.finished {
                break;
            }
        }

        if !self.decoder.is_finished() {
            tracing::debug!(
                target: "quill.run",
                run_id = %self.id,
                pending_bytes = self.decoder.pending_bytes(),
                "stream ended without a completion marker"
            );
        }
        if self.decoder.malformed_events() > 0 {
            tracing::warn!(
                target: "quill.run",
                run_id = %self.id,
                skipped = self.decoder.malformed_events(),
                "skipped malformed events"
            );
        }

        Ok(AttemptResult::Completed { fragments })
    }
}
