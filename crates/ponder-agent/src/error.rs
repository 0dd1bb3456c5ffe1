//! Agent errors.
//!
//! Tool failures the model can react to are observations, not errors. An
//! `AgentError` that escapes [`crate::ReactAgent::run`] ends the query.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The chat backend failed.
    #[error("LLM error: {0}")]
    Llm(#[from] ponder_llm::LlmError),

    /// A tool could not do its job (upstream service down, bad response).
    #[error("Tool error: {0}")]
    Tool(String),

    /// The model named an action that is not registered.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments did not match the tool's schema.
    #[error("Invalid tool parameters: {0}")]
    InvalidToolParams(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Agent misconfigured: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            AgentError::tool("wttr.in returned 503").to_string(),
            "Tool error: wttr.in returned 503"
        );
        assert_eq!(
            AgentError::ToolNotFound("teleport".to_string()).to_string(),
            "Tool not found: teleport"
        );
    }

    #[test]
    fn test_llm_errors_convert() {
        let err: AgentError = ponder_llm::LlmError::Auth("bad key".to_string()).into();
        assert!(matches!(err, AgentError::Llm(_)));
        assert!(err.to_string().contains("bad key"));
    }
}
