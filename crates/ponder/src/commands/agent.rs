//! Agent command - answer a query with the ReAct agent.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::Style;

use ponder_agent::{
    AgentConfig, AgentResponse, ReactAgent, SearchProvider, WebSearchConfig, default_registry,
};
use ponder_config::{AgentSection, Backend, SEARCH_API_KEY_ENV, SearchSection};
use ponder_llm::{OpenAiBackend, SharedChatBackend};

use super::{Context, server_config};

/// Arguments for the agent command.
#[derive(Args, Debug, Default)]
pub struct AgentArgs {
    /// The question to answer
    pub query: String,

    /// Maximum model calls before giving up
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Chat model name
    #[arg(long)]
    pub model: Option<String>,

    /// Chat server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl AgentArgs {
    /// The `[agent]` section with flag overrides applied.
    fn section(&self, ctx: &Context) -> AgentSection {
        let section = ctx.config().agent();
        AgentSection {
            model: self.model.clone().or(section.model),
            base_url: self.base_url.clone().or(section.base_url),
            max_iterations: self.max_iterations.or(section.max_iterations),
            ..section
        }
    }
}

/// Agent loop settings from a resolved `[agent]` section.
fn agent_config(section: &AgentSection) -> AgentConfig {
    let mut config = AgentConfig::new(section.effective_model());
    if let Some(n) = section.max_iterations {
        config = config.with_max_iterations(n);
    }
    if let Some(t) = section.temperature {
        config = config.with_temperature(t);
    }
    if let Some(n) = section.max_tokens {
        config = config.with_max_tokens(n);
    }
    config
}

/// Search settings: Serper when a key resolves, DuckDuckGo otherwise.
fn search_config(section: &SearchSection) -> WebSearchConfig {
    let key = ponder_config::resolve_secret(SEARCH_API_KEY_ENV, section.api_key.as_deref());
    let mut config = WebSearchConfig {
        provider: SearchProvider::from_api_key(key.map(|k| k.value)),
        ..Default::default()
    };
    if let Some(n) = section.max_results {
        config.max_results = n;
    }
    config
}

/// Run the agent command.
pub async fn run(args: AgentArgs, ctx: &Context) -> Result<()> {
    let section = args.section(ctx);
    let server = server_config(
        &section.llm(),
        Backend::Siliconflow,
        section.effective_model(),
        3,
    )?;
    let backend: SharedChatBackend = Arc::new(OpenAiBackend::new(server)?);

    let search = search_config(&ctx.config().search());
    tracing::debug!(provider = search.provider.name(), "Web search configured");

    let agent = ReactAgent::new(backend, default_registry(search), agent_config(&section))?;
    let response = agent.run(&args.query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response, ctx.verbose);
    }
    Ok(())
}

fn print_response(response: &AgentResponse, verbose: bool) {
    let dim = Style::new().dim();
    let yellow = Style::new().yellow();

    for step in &response.steps {
        if verbose {
            if let Some(thought) = &step.thought {
                println!("{}", dim.apply_to(format!("Thought: {thought}")));
            }
        }
        println!("{}", dim.apply_to(format!("Action: {}[{}]", step.action, step.input)));
        if verbose {
            println!("{}", dim.apply_to(format!("Observation: {}", step.observation)));
        }
    }
    if !response.steps.is_empty() {
        println!();
    }

    println!("{}", response.answer);

    if response.truncated {
        eprintln!(
            "{} stopped after {} iterations without a final answer",
            yellow.apply_to("note:"),
            response.iterations
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_config::{LoadedConfig, PonderConfig};

    fn context(toml: &str) -> Context {
        Context {
            loaded: LoadedConfig {
                config: PonderConfig::from_toml(toml).unwrap(),
                sources: Vec::new(),
                warnings: Vec::new(),
            },
            verbose: false,
        }
    }

    #[test]
    fn test_agent_config_defaults() {
        let section = AgentArgs::default().section(&context(""));
        let config = agent_config(&section);
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_flags_override_agent_section() {
        let ctx = context(
            "[agent]\nmodel = \"file-model\"\nmax_iterations = 5\ntemperature = 0.1\nmax_tokens = 300\n",
        );
        let args = AgentArgs {
            query: "q".to_string(),
            max_iterations: Some(2),
            ..Default::default()
        };
        let config = agent_config(&args.section(&ctx));
        assert_eq!(config.model, "file-model");
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.max_tokens, 300);
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_search_provider_follows_key() {
        unsafe { std::env::remove_var(SEARCH_API_KEY_ENV) };
        let search = search_config(&SearchSection::default());
        assert_eq!(search.provider.name(), "duckduckgo");

        let search = search_config(&SearchSection {
            api_key: Some("serper-key".to_string()),
            max_results: Some(3),
        });
        assert_eq!(search.provider.name(), "serper");
        assert_eq!(search.max_results, 3);
    }
}
