// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock chat client for testing
//!
//! Replays scripted responses without making real API calls. Each call to
//! `start_stream` consumes the next scripted response in order.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::Credentials;
use crate::error::{ApiError, QuillError, Result};
use crate::llm::client::{ByteChunkStream, ChatClient, CompletionRequest};

/// Sending half of a live scripted body.
pub type ChunkSender = mpsc::Sender<Result<Vec<u8>>>;

/// Failure returned before the body starts.
#[derive(Debug, Clone)]
pub enum MockFailure {
    RateLimited,
    AuthenticationFailed,
    Network(String),
    Server(u16, String),
}

impl MockFailure {
    fn into_error(self) -> QuillError {
        match self {
            MockFailure::RateLimited => ApiError::RateLimited { retry_after: None }.into(),
            MockFailure::AuthenticationFailed => ApiError::AuthenticationFailed.into(),
            MockFailure::Network(message) => ApiError::Network(message).into(),
            MockFailure::Server(status, message) => {
                ApiError::ServerError { status, message }.into()
            }
        }
    }
}

/// One scripted answer.
pub enum ScriptedResponse {
    /// Body delivered as these chunks, then the stream ends
    Chunks(Vec<Vec<u8>>),
    /// Body delivered as these chunks, then a transport error
    BrokenStream(Vec<Vec<u8>>, String),
    /// Request rejected before any chunk
    Fail(MockFailure),
    /// Body fed live by the test through a [`ChunkSender`]
    Live(mpsc::Receiver<Result<Vec<u8>>>),
}

impl ScriptedResponse {
    /// Body split into one chunk per event.
    pub fn events(fragments: &[&str]) -> Self {
        let mut chunks: Vec<Vec<u8>> = fragments
            .iter()
            .map(|f| sse_event(f).into_bytes())
            .collect();
        chunks.push(SSE_DONE.as_bytes().to_vec());
        ScriptedResponse::Chunks(chunks)
    }

    /// Live body plus the handle used to feed it.
    pub fn live() -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(16);
        (tx, ScriptedResponse::Live(rx))
    }
}

/// End-of-stream event.
pub const SSE_DONE: &str = "data: [DONE]\n\n";

/// One complete data event carrying `content` as its delta.
pub fn sse_event(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

/// Whole body for `fragments` followed by the sentinel.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body: String = fragments.iter().map(|f| sse_event(f)).collect();
    body.push_str(SSE_DONE);
    body
}

/// A mock chat client for testing
#[derive(Clone, Default)]
pub struct MockChatClient {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    call_count: Arc<AtomicUsize>,
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client that answers with the given responses in order
    pub fn with_responses(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        let client = Self::new();
        for response in responses {
            client.push(response);
        }
        client
    }

    /// Queue another response
    pub fn push(&self, response: ScriptedResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Number of `start_stream` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.recorded_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start_stream(
        &self,
        request: &CompletionRequest,
        _credentials: &Credentials,
    ) -> Result<ByteChunkStream> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut recorded) = self.recorded_requests.lock() {
            recorded.push(request.clone());
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());

        match next {
            Some(ScriptedResponse::Chunks(chunks)) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(Ok::<Vec<u8>, QuillError>),
            ))),
            Some(ScriptedResponse::BrokenStream(chunks, message)) => {
                let stream = async_stream::stream! {
                    for chunk in chunks {
                        yield Ok(chunk);
                    }
                    yield Err(QuillError::Api(ApiError::StreamError(message)));
                };
                Ok(Box::pin(stream))
            }
            Some(ScriptedResponse::Fail(failure)) => Err(failure.into_error()),
            Some(ScriptedResponse::Live(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            None => Err(ApiError::InvalidResponse("no scripted response left".to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn credentials() -> Credentials {
        Credentials::new("sk-test")
    }

    #[test]
    fn test_sse_body_shape() {
        let body = sse_body(&["a", "b"]);
        assert_eq!(body.matches("\n\n").count(), 3);
        assert!(body.ends_with(SSE_DONE));
    }

    #[tokio::test]
    async fn test_replays_chunks_in_order() {
        let client = MockChatClient::with_responses([ScriptedResponse::Chunks(vec![
            b"one".to_vec(),
            b"two".to_vec(),
        ])]);
        let stream = client
            .start_stream(&CompletionRequest::new("p", "d"), &credentials())
            .await
            .unwrap();
        let chunks: Vec<Vec<u8>> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.recorded_requests()[0].prompt, "p");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let client = MockChatClient::with_responses([ScriptedResponse::Fail(
            MockFailure::RateLimited,
        )]);
        let result = client
            .start_stream(&CompletionRequest::new("p", "d"), &credentials())
            .await;
        assert!(matches!(result, Err(ref e) if e.is_rate_limited()));
    }

    #[tokio::test]
    async fn test_broken_stream_ends_with_error() {
        let client = MockChatClient::with_responses([ScriptedResponse::BrokenStream(
            vec![b"x".to_vec()],
            "reset".to_string(),
        )]);
        let mut stream = client
            .start_stream(&CompletionRequest::new("p", "d"), &credentials())
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_script_is_an_error() {
        let client = MockChatClient::new();
        let result = client
            .start_stream(&CompletionRequest::new("p", "d"), &credentials())
            .await;
        assert!(result.is_err());
    }
}
