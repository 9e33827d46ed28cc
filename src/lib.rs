// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Quill - commit messages streamed from staged changes.
//!
//! The crate exposes the library used by the `quill` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `llm`: token estimate, chat-completions client, streaming event decoder
//! - `generate`: run coordinator, per-repository run state machine, retry/backoff
//! - `vcs`: repository discovery, staged diffs and commit-message sinks
//! - `config`: settings file and the credentials/prompt collaborator

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod llm;
pub mod sink;
pub mod vcs;

pub use error::{QuillError, Result};
