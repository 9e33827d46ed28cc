// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Commit-message generation
//!
//! The coordinator walks the workspace's repositories; each repository gets
//! one run, which streams a completion into the repository's sink and
//! retries on rate limiting.

pub mod coordinator;
pub mod observer;
pub mod registry;
pub mod retry;
pub mod run;

pub use coordinator::{CommandOutcome, GenerationOptions, RunCoordinator, RunReport};
pub use observer::{NoopObserver, RunObserver};
pub use registry::{RunRegistry, RunSlot};
pub use retry::{RetryConfig, RetryController, RetryDecision};
pub use run::{AttemptResult, Notice, NoticeLevel, Run, RunOutcome, RunState};
