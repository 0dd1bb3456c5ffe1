//! Budget command - reason within a thinking budget, then answer.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;

use ponder_budget::{
    BudgetConfig, BudgetSampler, DEFAULT_FINAL_MAX_TOKENS, DEFAULT_MAX_ROUNDS, EXAMPLE_QUESTION,
    Report,
};

use super::{Context, ModelArgs, Resources};

/// Arguments for the budget command.
#[derive(Args, Debug)]
pub struct BudgetArgs {
    /// Question to reason about (defaults to a built-in competition problem)
    pub question: Option<String>,

    /// Thinking-token budget
    #[arg(short, long)]
    pub budget: Option<u32>,

    /// Give up after this many reasoning rounds
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Token cap for the final answer call
    #[arg(long)]
    pub final_max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Directory for the transcript file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Do not write a transcript file
    #[arg(long)]
    pub no_save: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl BudgetArgs {
    /// Loop settings: flags, then `[budget]`, then defaults.
    fn budget_config(&self, ctx: &Context) -> BudgetConfig {
        let section = ctx.config().budget();

        let mut config = BudgetConfig::new(self.budget.unwrap_or(section.effective_budget()))
            .with_max_rounds(
                self.max_rounds
                    .or(section.max_rounds)
                    .unwrap_or(DEFAULT_MAX_ROUNDS),
            )
            .with_final_max_tokens(
                self.final_max_tokens
                    .or(section.final_max_tokens)
                    .unwrap_or(DEFAULT_FINAL_MAX_TOKENS),
            );
        if let Some(temperature) = self.temperature.or(section.temperature) {
            config = config.with_temperature(temperature);
        }
        if !self.no_save {
            let dir = self
                .output_dir
                .clone()
                .or(section.output_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            config = config.with_output_dir(dir);
        }
        config
    }
}

/// Run the budget command.
pub async fn run(args: BudgetArgs, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();
    let bold = Style::new().bold();

    let config = args.budget_config(ctx);
    let Resources {
        generator,
        tokenizer,
        template,
    } = args.model.resources(ctx)?;

    let question = args
        .question
        .clone()
        .unwrap_or_else(|| EXAMPLE_QUESTION.to_string());

    if ctx.verbose {
        println!(
            "{}",
            dim.apply_to(format!(
                "budget: {}, max rounds: {}, final max tokens: {}",
                config.budget, config.max_rounds, config.final_max_tokens
            ))
        );
    }

    let sampler = BudgetSampler::new(&generator, &tokenizer, &template, config)?;
    let outcome = sampler.run(&question).await?;

    println!("{}", outcome.transcript);
    println!();
    println!("{}", bold.apply_to(outcome.summary()));
    if let Some(path) = &outcome.transcript_path {
        println!("{}", dim.apply_to(format!("Saved to {}", path.display())));
    }

    Ok(())
}
