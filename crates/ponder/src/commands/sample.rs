//! Sample command - a single unconstrained generation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;

use ponder_budget::{
    DEFAULT_SAMPLE_MAX_TOKENS, EXAMPLE_QUESTION, Report, SampleConfig, SinglePassSampler,
};

use super::{Context, ModelArgs, Resources};

/// Arguments for the sample command.
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Question to answer (defaults to a built-in competition problem)
    pub question: Option<String>,

    /// Token cap for the generation
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Write the transcript to a file
    #[arg(long)]
    pub save: bool,

    /// Directory for the transcript file (implies --save)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl SampleArgs {
    fn sample_config(&self, ctx: &Context) -> SampleConfig {
        let section = ctx.config().sample();
        let mut config = SampleConfig {
            max_tokens: self
                .max_tokens
                .or(section.max_tokens)
                .unwrap_or(DEFAULT_SAMPLE_MAX_TOKENS),
            ..Default::default()
        };
        if let Some(temperature) = self.temperature.or(section.temperature) {
            config.temperature = temperature;
        }
        config.output_dir = match (&self.output_dir, self.save) {
            (Some(dir), _) => Some(dir.clone()),
            (None, true) => Some(section.output_dir.unwrap_or_else(|| PathBuf::from("."))),
            (None, false) => None,
        };
        config
    }
}

/// Run the sample command.
pub async fn run(args: SampleArgs, ctx: &Context) -> Result<()> {
    let config = args.sample_config(ctx);
    let Resources {
        generator,
        tokenizer,
        template,
    } = args.model.resources(ctx)?;

    let question = args.question.as_deref().unwrap_or(EXAMPLE_QUESTION);
    let sampler = SinglePassSampler::new(&generator, &tokenizer, &template, config);
    let outcome = sampler.run(question).await?;

    println!("{}", outcome.transcript);
    println!();
    println!("{}", Style::new().bold().apply_to(outcome.summary()));
    if let Some(path) = &outcome.transcript_path {
        println!(
            "{}",
            Style::new()
                .dim()
                .apply_to(format!("Saved to {}", path.display()))
        );
    }

    Ok(())
}
