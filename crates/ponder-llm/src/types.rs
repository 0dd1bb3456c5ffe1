//! Core types for generation and chat requests.
//!
//! Raw text generation mirrors what an inference engine exposes: a prompt
//! string in, a continuation out. Chat types cover role-tagged conversations
//! sent to chat-completion endpoints.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Sampling Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Configuration governing a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Stop sequences; generation halts when any is produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Whether special tokens are removed from the output text.
    pub skip_special_tokens: bool,
}

impl SamplingParams {
    /// Create parameters with the given token cap and default temperature.
    pub fn new(max_tokens: u32) -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens,
            stop: Vec::new(),
            skip_special_tokens: true,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Add a stop sequence.
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    /// Keep special tokens (such as reasoning markers) in the output text.
    pub fn keep_special_tokens(mut self) -> Self {
        self.skip_special_tokens = false;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation Result
// ─────────────────────────────────────────────────────────────────────────────

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Hit a stop sequence or the end-of-sequence token.
    Stop,
    /// Hit the token cap.
    Length,
    /// Anything else the server reported.
    Other,
}

impl FinishReason {
    /// Parse the `finish_reason` string used by OpenAI-compatible servers.
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") | Some("eos") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
}

impl Usage {
    /// Create a new usage record.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Result of a raw text generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// The prompt that was sent, echoed back.
    pub prompt: String,
    /// The generated continuation.
    pub text: String,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Usage if the server reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Generation {
    /// Create a generation result.
    pub fn new(prompt: impl Into<String>, text: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            prompt: prompt.into(),
            text: text.into(),
            finish_reason,
            usage: None,
        }
    }

    /// Prompt followed by continuation.
    pub fn full_text(&self) -> String {
        let mut out = String::with_capacity(self.prompt.len() + self.text.len());
        out.push_str(&self.prompt);
        out.push_str(&self.text);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Types
// ─────────────────────────────────────────────────────────────────────────────

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use. Backends may override with their configured model.
    pub model: String,
    /// The conversation, system message first if present.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Create a chat request with default sampling.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: 2000,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A chat completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that served the response.
    pub model: String,
    /// Assistant message content.
    pub content: String,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Usage if the server reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Create a response with the given content.
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }
}
