// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Quill
//!
//! Token estimation, the streaming chat client, and the event-stream decoder.

pub mod client;
pub mod decoder;
pub mod mock_client;
pub mod tokens;

pub use client::{ByteChunkStream, ChatClient, CompletionRequest, OpenAiClient};
pub use decoder::{DecodeStep, SseDecoder};
pub use tokens::estimate_tokens;
