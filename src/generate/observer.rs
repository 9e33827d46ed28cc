// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Run lifecycle notifications

use std::time::Duration;

use crate::error::QuillError;
use crate::vcs::RepositoryHandle;

use super::run::RunOutcome;

/// Receives user-facing events from the coordinator.
///
/// Every hook has a no-op default so implementors pick what they show.
pub trait RunObserver: Send + Sync {
    /// A run for `repo` is about to read its diff.
    fn on_run_started(&self, _repo: &RepositoryHandle) {}

    /// Attempt `attempt` was rate limited; the next one starts after `delay`.
    fn on_rate_limited(&self, _repo: &RepositoryHandle, _attempt: u32, _delay: Duration) {}

    /// A run reached a terminal state.
    fn on_run_finished(&self, _repo: &RepositoryHandle, _outcome: &RunOutcome) {}

    /// The command was invoked while another invocation holds the slot.
    fn on_already_running(&self) {}

    /// Repositories could not be listed.
    fn on_discovery_failed(&self, _error: &QuillError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
