//! Thinking-budget sampling.
//!
//! The loop keeps a model reasoning until its reasoning segment is longer
//! than the budget, then forces the segment closed and asks for the answer:
//!
//! ```text
//! input ──► generate(cap = budget - thinking, stop = </think>) ──► count
//!             ▲                                                     │
//!             └──────────── append "\nWait!\n" ◄──── ≤ budget ──────┤
//!                                                                   │ > budget
//!                               generate(input + "\n</think>\n") ◄──┘
//! ```
//!
//! Calls are strictly sequential and any generation error ends the run.

use std::path::PathBuf;

use ponder_llm::{ChatTemplate, DEFAULT_TEMPERATURE, Generator, SamplingParams, TokenCounter};

use crate::error::{BudgetError, Result};
use crate::markers::ThinkMarkers;
use crate::prompt::{SYSTEM_PROMPT, render_input};
use crate::transcript::{Report, write_report};

/// Default token cap for the answer-producing call.
pub const DEFAULT_FINAL_MAX_TOKENS: u32 = 4096;

/// Default ceiling on reasoning rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for a thinking-budget run.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Thinking tokens the model must exceed before it may answer.
    pub budget: u32,
    /// Sampling temperature for every call.
    pub temperature: f32,
    /// Token cap for the final answer call.
    pub final_max_tokens: u32,
    /// Rounds allowed before giving up.
    pub max_rounds: u32,
    /// Reasoning markers.
    pub markers: ThinkMarkers,
    /// System instruction.
    pub system_prompt: String,
    /// Directory for the transcript file; none skips writing.
    pub output_dir: Option<PathBuf>,
}

impl BudgetConfig {
    /// Create a config with the given budget and defaults elsewhere.
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            temperature: DEFAULT_TEMPERATURE,
            final_max_tokens: DEFAULT_FINAL_MAX_TOKENS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            markers: ThinkMarkers::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            output_dir: None,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the final answer token cap.
    pub fn with_final_max_tokens(mut self, max_tokens: u32) -> Self {
        self.final_max_tokens = max_tokens;
        self
    }

    /// Set the round ceiling.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the markers.
    pub fn with_markers(mut self, markers: ThinkMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Set the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Write the transcript into `dir` when the run finishes.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a thinking-budget run.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOutcome {
    /// Final prompt plus the answer continuation.
    pub transcript: String,
    /// Reasoning rounds issued before the answer call.
    pub rounds: u32,
    /// Tokens in the rendered input.
    pub input_tokens: usize,
    /// Tokens in the final reasoning segment of the transcript.
    pub thinking_tokens: usize,
    /// Thinking count measured when the loop exited.
    pub loop_thinking_tokens: usize,
    /// Tokens in the whole transcript.
    pub total_tokens: usize,
    /// Where the transcript was written, if it was.
    pub transcript_path: Option<PathBuf>,
    close_marker: String,
}

impl BudgetOutcome {
    /// Text after the last closing marker.
    pub fn answer(&self) -> &str {
        match self.transcript.rfind(&self.close_marker) {
            Some(idx) => self.transcript[idx + self.close_marker.len()..].trim(),
            None => self.transcript.trim(),
        }
    }
}

impl Report for BudgetOutcome {
    fn transcript(&self) -> &str {
        &self.transcript
    }

    fn summary(&self) -> String {
        format!(
            "rounds: {}, input tokens: {}, thinking tokens: {}, total tokens: {}",
            self.rounds, self.input_tokens, self.thinking_tokens, self.total_tokens
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sampler
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a model through budgeted reasoning.
///
/// The generator, tokenizer and template are borrowed; their lifecycle
/// belongs to the caller.
pub struct BudgetSampler<'a> {
    generator: &'a dyn Generator,
    tokenizer: &'a dyn TokenCounter,
    template: &'a ChatTemplate,
    config: BudgetConfig,
}

impl<'a> BudgetSampler<'a> {
    /// Create a sampler. A zero budget is rejected.
    pub fn new(
        generator: &'a dyn Generator,
        tokenizer: &'a dyn TokenCounter,
        template: &'a ChatTemplate,
        config: BudgetConfig,
    ) -> Result<Self> {
        if config.budget == 0 {
            return Err(BudgetError::InvalidBudget(config.budget));
        }
        Ok(Self {
            generator,
            tokenizer,
            template,
            config,
        })
    }

    /// The run configuration.
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Parameters for a reasoning round after `thinking_tokens` are spent.
    ///
    /// The cap never drops below one token.
    pub fn round_params(&self, thinking_tokens: usize) -> SamplingParams {
        let remaining = (self.config.budget as usize)
            .saturating_sub(thinking_tokens)
            .max(1);
        SamplingParams::new(remaining as u32)
            .with_temperature(self.config.temperature)
            .with_stop(self.config.markers.close.clone())
            .keep_special_tokens()
    }

    /// Parameters for the answer call.
    pub fn final_params(&self) -> SamplingParams {
        SamplingParams::new(self.config.final_max_tokens)
            .with_temperature(self.config.temperature)
            .keep_special_tokens()
    }

    /// Count reasoning tokens in `accumulated`: everything after the last
    /// opening line, or everything generated after `input` if the model
    /// never opened a reasoning block.
    fn count_thinking(&self, input: &str, accumulated: &str) -> Result<usize> {
        let span = match self.config.markers.after_last_open(accumulated) {
            Some(span) => span,
            None => accumulated.strip_prefix(input).unwrap_or(accumulated),
        };
        Ok(self.tokenizer.count(span)?)
    }

    /// Answer `question` with at least `budget` tokens of reasoning.
    pub async fn run(&self, question: &str) -> Result<BudgetOutcome> {
        let markers = &self.config.markers;
        let budget = self.config.budget as usize;
        let max_rounds = self.config.max_rounds.max(1);

        let input = render_input(self.template, &self.config.system_prompt, question)?;
        let input_tokens = self.tokenizer.count(&input)?;

        tracing::info!(
            generator = self.generator.name(),
            budget,
            max_rounds,
            input_tokens,
            "Starting thinking-budget run"
        );

        let mut prompt = input.clone();
        let mut thinking_tokens = 0;
        let mut rounds = 0;

        let accumulated = loop {
            let params = self.round_params(thinking_tokens);
            let generation = self.generator.generate(&prompt, &params).await?;
            rounds += 1;

            let accumulated = generation.full_text();
            thinking_tokens = self.count_thinking(&input, &accumulated)?;

            tracing::info!(
                round = rounds,
                max_tokens = params.max_tokens,
                thinking_tokens,
                budget,
                "Reasoning round finished"
            );

            if thinking_tokens > budget {
                break accumulated;
            }
            if rounds >= max_rounds {
                return Err(BudgetError::RoundLimit {
                    rounds,
                    thinking_tokens,
                    budget: self.config.budget,
                });
            }

            prompt = accumulated + &markers.continuation;
        };

        let final_prompt = accumulated + &markers.forced_close();
        let generation = self
            .generator
            .generate(&final_prompt, &self.final_params())
            .await?;
        let transcript = generation.full_text();

        let mut outcome = BudgetOutcome {
            thinking_tokens: self.tokenizer.count(markers.final_segment(&transcript))?,
            total_tokens: self.tokenizer.count(&transcript)?,
            transcript,
            rounds,
            input_tokens,
            loop_thinking_tokens: thinking_tokens,
            transcript_path: None,
            close_marker: markers.close.clone(),
        };

        tracing::info!(
            rounds,
            input_tokens,
            thinking_tokens = outcome.thinking_tokens,
            total_tokens = outcome.total_tokens,
            "Thinking-budget run finished"
        );

        if let Some(dir) = &self.config.output_dir {
            outcome.transcript_path = Some(write_report(dir, &outcome).await?);
        }

        Ok(outcome)
    }
}
