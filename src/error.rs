// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Quill
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for Quill operations
#[derive(Error, Debug)]
pub enum QuillError {
    /// Chat endpoint and transport errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Staged diff is larger than the configured token ceiling
    #[error("Diff too large: ~{estimated} tokens exceeds limit of {limit}")]
    QuotaExceeded { estimated: u32, limit: u32 },

    /// API key or prompt template unavailable
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Repository could not be opened or read
    #[error("No repository: {0}")]
    NoRepository(String),

    /// Git operation failed on an opened repository
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Commit-message sink could not be written
    #[error("Sink error: {0}")]
    Sink(String),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 429 from the endpoint
    #[error("Rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Response body failed mid-stream
    #[error("Streaming error: {0}")]
    StreamError(String),
}

impl QuillError {
    /// Whether this failure is the endpoint asking us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuillError::Api(ApiError::RateLimited { .. }))
    }

    /// Whether this failure came from the network call or the response body.
    pub fn is_transport(&self) -> bool {
        matches!(self, QuillError::Api(_)) && !self.is_rate_limited()
    }
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(": retry after {} seconds", secs),
        None => String::new(),
    }
}

/// Result type alias for Quill operations
pub type Result<T> = std::result::Result<T, QuillError>;

impl From<git2::Error> for QuillError {
    fn from(err: git2::Error) -> Self {
        QuillError::Git(err.message().to_string())
    }
}
