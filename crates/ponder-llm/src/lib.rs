//! Model-serving client layer for Ponder.
//!
//! This crate owns everything that touches the model: the request types,
//! the backend traits the rest of the workspace programs against, an
//! OpenAI-compatible HTTP client (vLLM, OpenAI, SiliconFlow), token counting
//! and chat-template rendering.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  Generator trait         │   │  ChatBackend trait       │
//! │  - generate(prompt)      │   │  - chat(messages)        │
//! └──────────────────────────┘   └──────────────────────────┘
//!              │                              │
//!              └──────────────┬───────────────┘
//!                             ▼
//!                  ┌────────────────────┐
//!                  │   OpenAiBackend    │  /v1/completions, /v1/chat/completions
//!                  └────────────────────┘
//! ```
//!
//! [`TokenCounter`] and [`ChatTemplate`] are local: they mirror what the
//! serving engine does to a prompt so callers can reason about token spans.

pub mod backend;
pub mod error;
pub mod openai;
pub mod template;
pub mod tokenizer;
pub mod types;

pub use backend::{
    ChatBackend, GenerationCall, Generator, MockChatBackend, MockGenerator, SharedChatBackend,
    SharedGenerator, with_retry,
};
pub use error::{LlmError, RateLimitInfo, Result};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use template::{ChatTemplate, DEFAULT_CHAT_TEMPLATE, TOKENIZER_CONFIG_FILE, TemplateOptions};
pub use tokenizer::{HfTokenizer, TOKENIZER_FILE, TokenCounter, WhitespaceTokenizer};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, DEFAULT_TEMPERATURE, FinishReason, Generation, Role,
    SamplingParams, Usage,
};
