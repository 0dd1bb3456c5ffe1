//! ReAct agent for Ponder.
//!
//! The agent alternates between asking a chat model what to do and running
//! the tool it names:
//!
//! ```text
//! ┌──────────────┐  Thought / Action / Action Input  ┌─────────────┐
//! │  ChatBackend │ ────────────────────────────────▶ │ ReactParser │
//! └──────────────┘                                   └──────┬──────┘
//!        ▲                                                  │
//!        │ "{response}\nObservation: {result}\n"            ▼
//!        └──────────────────────────────────────── ┌──────────────┐
//!                                                  │ ToolRegistry │
//!                                                  └──────────────┘
//! ```
//!
//! until the model writes `Final Answer:` or the iteration limit is reached.

pub mod agent;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod tool;
pub mod tools;

pub use agent::{AgentConfig, AgentResponse, AgentStep, DEFAULT_AGENT_MODEL, ReactAgent};
pub use error::{AgentError, Result};
pub use parse::{ActionInput, ReactParser, ReactStep};
pub use prompt::{build_system_prompt, system_prompt};
pub use tool::{
    OutputConfig, ParameterValidationError, Tool, ToolRegistry, ToolResult, validate_arguments,
};
pub use tools::{
    CalculatorTool, SearchProvider, WeatherTool, WebSearchConfig, WebSearchTool, default_registry,
};
