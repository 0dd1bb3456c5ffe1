//! Error types for the budget crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the budget error type.
pub type Result<T> = std::result::Result<T, BudgetError>;

/// Error type for budget-controlled generation.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Model, tokenizer or template failure. Always fatal to the run.
    #[error("LLM error: {0}")]
    Llm(#[from] ponder_llm::LlmError),

    /// The thinking budget must be positive.
    #[error("Invalid budget: {0} (must be at least 1 token)")]
    InvalidBudget(u32),

    /// The round ceiling was reached before the budget was consumed.
    #[error(
        "Round limit reached after {rounds} rounds with {thinking_tokens} of {budget} thinking tokens"
    )]
    RoundLimit {
        rounds: u32,
        thinking_tokens: usize,
        budget: u32,
    },

    /// Writing the transcript failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BudgetError {
    /// Create an I/O error tied to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
