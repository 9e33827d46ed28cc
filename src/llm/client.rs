// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat completion client
//!
//! Sends the prompt and diff to an OpenAI-compatible chat-completions
//! endpoint in streaming mode and hands back the raw response body as a
//! stream of byte chunks. Interpreting the body is the decoder's job.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::config::{Credentials, ProviderConfig};
use crate::error::{ApiError, QuillError, Result};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Response body as it arrives from the transport.
pub type ByteChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// What gets sent for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Prompt template text
    pub prompt: String,
    /// Staged diff
    pub diff: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, diff: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            diff: diff.into(),
        }
    }

    /// The single user message: template, newline, diff.
    pub fn user_message(&self) -> String {
        format!("{}\n{}", self.prompt, self.diff)
    }
}

/// Issues streaming completion requests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Client name for logs
    fn name(&self) -> &str;

    /// Start one streaming request.
    ///
    /// Failures detectable before the first chunk (connection, non-2xx status)
    /// are returned here; failures after that arrive as stream items.
    async fn start_stream(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<ByteChunkStream>;
}

/// Client for OpenAI-compatible chat-completions endpoints
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiClient {
    /// Create a client for the default endpoint
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_base_url(model, OPENAI_API_URL)
    }

    /// Create with a custom base URL
    pub fn with_base_url(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Create from the provider section of the settings
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut client = Self::with_base_url(&config.model, &config.base_url);
        client.temperature = config.temperature;
        client
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.user_message(),
            }],
            temperature: self.temperature,
            stream: true,
        }
    }

    /// Parse an error response
    fn parse_error(status: u16, headers: &HeaderMap, body: &str) -> QuillError {
        if status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
            return ApiError::RateLimited {
                retry_after: parse_retry_after_seconds(headers),
            }
            .into();
        }
        if status == StatusCode::UNAUTHORIZED.as_u16() {
            return ApiError::AuthenticationFailed.into();
        }

        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());

        ApiError::ServerError { status, message }.into()
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn start_stream(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<ByteChunkStream> {
        let body = self.build_request(request);

        tracing::debug!(
            target: "quill.client",
            model = %self.model,
            url = %self.base_url,
            diff_bytes = request.diff.len(),
            "sending streaming completion request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", credentials.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(target: "quill.client", status = status.as_u16(), "request rejected");
            return Err(Self::parse_error(status.as_u16(), &headers, &body));
        }

        let byte_stream = response.bytes_stream().map(|result| {
            result
                .map(|bytes| bytes.to_vec())
                .map_err(|e| QuillError::Api(ApiError::StreamError(e.to_string())))
        });

        Ok(Box::pin(byte_stream))
    }
}

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

// Wire types (OpenAI-compatible format)

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
