//! Generation and chat backend traits, plus mock implementations.
//!
//! Two seams are exposed to the rest of the workspace:
//!
//! - [`Generator`]: raw text completion (prompt string in, continuation out),
//!   the interface an inference engine such as vLLM serves.
//! - [`ChatBackend`]: role-tagged chat completion.
//!
//! Both are implemented by [`crate::OpenAiBackend`] and by mocks for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, ChatResponse, FinishReason, Generation, SamplingParams};

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures, rate limits).
/// Non-retryable errors are returned immediately. A rate limit that carries
/// a `Retry-After` hint waits for that long instead of the current backoff.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt >= max_retries {
                    return Err(e);
                }

                let wait = e.retry_after().unwrap_or(backoff);
                attempt += 1;
                tracing::warn!(
                    backend = backend_name,
                    attempt,
                    max_retries,
                    backoff_ms = wait.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(wait).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Raw text generation against a model-serving component.
///
/// Each call is a single request: the caller owns any looping, and errors
/// from the server are surfaced unchanged.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a continuation for `prompt` under `params`.
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<Generation>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// Chat completion against a model-serving component.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Execute a chat request and return the assistant reply.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A generator that can be shared across tasks.
pub type SharedGenerator = Arc<dyn Generator>;

/// A chat backend that can be shared across tasks.
pub type SharedChatBackend = Arc<dyn ChatBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Generator
// ─────────────────────────────────────────────────────────────────────────────

/// A generation request captured by [`MockGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    /// The prompt that was sent.
    pub prompt: String,
    /// The sampling parameters that were sent.
    pub params: SamplingParams,
}

type ResponderFn = dyn Fn(&str, &SamplingParams) -> String + Send + Sync;

enum MockSource {
    Scripted(Mutex<VecDeque<String>>),
    Responder(Box<ResponderFn>),
}

/// A mock generator for testing.
///
/// Either replays scripted continuations in order (erroring once they run
/// out) or computes each continuation from the prompt and parameters.
/// Every call is recorded.
pub struct MockGenerator {
    name: String,
    source: MockSource,
    calls: Mutex<Vec<GenerationCall>>,
}

impl MockGenerator {
    /// Create a mock that returns `continuations` in order.
    pub fn new<I, S>(continuations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "mock".to_string(),
            source: MockSource::Scripted(Mutex::new(
                continuations.into_iter().map(Into::into).collect(),
            )),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose continuation is computed per call.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str, &SamplingParams) -> String + Send + Sync + 'static,
    {
        Self {
            name: "mock".to_string(),
            source: MockSource::Responder(Box::new(responder)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Get all calls made to this generator.
    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl std::fmt::Debug for MockGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGenerator")
            .field("name", &self.name)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<Generation> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(GenerationCall {
                prompt: prompt.to_string(),
                params: params.clone(),
            });

        let text = match &self.source {
            MockSource::Scripted(queue) => queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .ok_or_else(|| {
                    LlmError::Backend("MockGenerator: no more responses available".to_string())
                })?,
            MockSource::Responder(responder) => responder(prompt, params),
        };

        Ok(Generation::new(prompt, text, FinishReason::Stop))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Chat Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock chat backend for testing.
///
/// Returns pre-configured replies in order; records every request.
#[derive(Debug)]
pub struct MockChatBackend {
    name: String,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatBackend {
    /// Create a mock that replies with `replies` in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "mock".to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Get all requests made to this backend.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let model = request.model.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| {
                LlmError::Backend("MockChatBackend: no more responses available".to_string())
            })?;

        Ok(ChatResponse::new(model, reply))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
