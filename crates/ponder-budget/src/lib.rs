//! Thinking-budget control for reasoning models.
//!
//! [`BudgetSampler`] keeps a model's reasoning segment open until it exceeds
//! a token budget, re-prompting with a continuation marker whenever the model
//! tries to close it early, then forces the segment shut and collects the
//! answer. [`SinglePassSampler`] runs the same prompt once without a budget
//! for comparison.

pub mod error;
pub mod markers;
pub mod prompt;
pub mod sampler;
pub mod single;
pub mod transcript;

pub use error::{BudgetError, Result};
pub use markers::ThinkMarkers;
pub use prompt::{EXAMPLE_QUESTION, SYSTEM_PROMPT, build_messages, render_input};
pub use sampler::{
    BudgetConfig, BudgetOutcome, BudgetSampler, DEFAULT_FINAL_MAX_TOKENS, DEFAULT_MAX_ROUNDS,
};
pub use single::{DEFAULT_SAMPLE_MAX_TOKENS, SampleConfig, SampleOutcome, SinglePassSampler};
pub use transcript::{Report, transcript_file_name, write_report};
