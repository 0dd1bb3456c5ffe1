//! Single-pass sampling: one unconstrained call, for comparison with the
//! budgeted loop.

use std::path::PathBuf;

use ponder_llm::{ChatTemplate, DEFAULT_TEMPERATURE, Generator, SamplingParams, TokenCounter};

use crate::error::Result;
use crate::markers::ThinkMarkers;
use crate::prompt::{SYSTEM_PROMPT, render_input};
use crate::transcript::{Report, write_report};

/// Default token cap for a single pass.
pub const DEFAULT_SAMPLE_MAX_TOKENS: u32 = 32768;

/// Settings for a single-pass run.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub markers: ThinkMarkers,
    pub system_prompt: String,
    pub output_dir: Option<PathBuf>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_SAMPLE_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            markers: ThinkMarkers::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            output_dir: None,
        }
    }
}

/// Result of a single pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub transcript: String,
    pub input_tokens: usize,
    pub thinking_tokens: usize,
    pub total_tokens: usize,
    pub transcript_path: Option<PathBuf>,
}

impl Report for SampleOutcome {
    fn transcript(&self) -> &str {
        &self.transcript
    }

    fn summary(&self) -> String {
        format!(
            "input tokens: {}, thinking tokens: {}, total tokens: {}",
            self.input_tokens, self.thinking_tokens, self.total_tokens
        )
    }
}

/// Renders the prompt and lets the model run to completion once.
pub struct SinglePassSampler<'a> {
    generator: &'a dyn Generator,
    tokenizer: &'a dyn TokenCounter,
    template: &'a ChatTemplate,
    config: SampleConfig,
}

impl<'a> SinglePassSampler<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        tokenizer: &'a dyn TokenCounter,
        template: &'a ChatTemplate,
        config: SampleConfig,
    ) -> Self {
        Self {
            generator,
            tokenizer,
            template,
            config,
        }
    }

    pub async fn run(&self, question: &str) -> Result<SampleOutcome> {
        let input = render_input(self.template, &self.config.system_prompt, question)?;
        let input_tokens = self.tokenizer.count(&input)?;

        let params = SamplingParams::new(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .keep_special_tokens();
        let generation = self.generator.generate(&input, &params).await?;
        let transcript = generation.full_text();

        let mut outcome = SampleOutcome {
            thinking_tokens: self
                .tokenizer
                .count(self.config.markers.final_segment(&transcript))?,
            total_tokens: self.tokenizer.count(&transcript)?,
            transcript,
            input_tokens,
            transcript_path: None,
        };

        tracing::info!(
            generator = self.generator.name(),
            input_tokens,
            thinking_tokens = outcome.thinking_tokens,
            total_tokens = outcome.total_tokens,
            finish_reason = ?generation.finish_reason,
            "Single pass finished"
        );

        if let Some(dir) = &self.config.output_dir {
            outcome.transcript_path = Some(write_report(dir, &outcome).await?);
        }

        Ok(outcome)
    }
}
