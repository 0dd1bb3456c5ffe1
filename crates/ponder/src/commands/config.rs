//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

use ponder_config::{
    Backend, DEFAULT_LLM_MODEL, LlmConfig, PROJECT_CONFIG_FILE, SEARCH_API_KEY_ENV,
};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./ponder.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration and log paths
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = ctx.config();

    println!("# Ponder Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let llm = config.llm();
    println!("Completion server (budget, sample):");
    print_connection(&llm, Backend::Vllm, DEFAULT_LLM_MODEL);
    let tokenizer = config.tokenizer();
    match &tokenizer.path {
        Some(path) => println!("  tokenizer: {}", path.display()),
        None => println!("  tokenizer: (not set, pass --tokenizer)"),
    }
    if let Some(template) = tokenizer.effective_template() {
        println!("  template:  {}", template.display());
    }
    println!();

    let budget = config.budget();
    println!("Budget:");
    println!("  budget:     {}", budget.effective_budget());
    if let Some(rounds) = budget.max_rounds {
        println!("  max rounds: {}", rounds);
    }
    println!();

    let agent = config.agent();
    println!("Agent:");
    print_connection(&agent.llm(), Backend::Siliconflow, agent.effective_model());
    if let Some(n) = agent.max_iterations {
        println!("  max iterations: {}", n);
    }
    let search = config.search();
    let search_key = ponder_config::resolve_secret(SEARCH_API_KEY_ENV, search.api_key.as_deref());
    match search_key {
        Some(key) => println!("  web search: serper (key from {})", key.source),
        None => println!("  web search: duckduckgo (set {} for serper)", SEARCH_API_KEY_ENV),
    }
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        println!("{}", config.to_toml()?);
    }

    Ok(())
}

fn print_connection(llm: &LlmConfig, fallback: Backend, model: &str) {
    let backend = llm.effective_backend(fallback);
    println!("  backend:  {}", backend.display_name());
    println!("  model:    {}", llm.model.as_deref().unwrap_or(model));
    println!("  base url: {}", llm.effective_base_url(fallback));
    println!("  api key:  {}", key_status(backend, llm));
}

fn key_status(backend: Backend, llm: &LlmConfig) -> String {
    match ponder_config::resolve_api_key(backend, llm.api_key.as_deref()) {
        Some(key) => format!("✓ {}", key.source),
        None if backend.requires_api_key() => format!("✗ missing (set {})", backend.env_var()),
        None => "not required".to_string(),
    }
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'ponder config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

const INIT_TEMPLATE: &str = r#"# Ponder Configuration

# Completion server used by `budget` and `sample`
[llm]
backend = "vllm"
model = "Qwen/Qwen3-14B"
base_url = "http://localhost:8000/v1"

[tokenizer]
# tokenizer.json, or the model directory holding it
# path = "/models/Qwen3-14B"

[budget]
budget = 32768
# max_rounds = 64
# output_dir = "."

# Chat server used by `agent` (key from SILICONFLOW_API_KEY)
[agent]
backend = "siliconflow"
model = "Qwen/Qwen3-30B-A3B-Instruct-2507"
max_iterations = 3

# Web search uses Serper when SERPER_API_KEY is set, DuckDuckGo otherwise
[search]
max_results = 10
"#;

fn init_path(local: bool) -> Result<PathBuf> {
    if local {
        return Ok(PathBuf::from(PROJECT_CONFIG_FILE));
    }
    ponder_config::user_config_path().ok_or_else(|| anyhow!("Could not determine config directory"))
}

fn cmd_init(local: bool) -> Result<()> {
    let path = init_path(local)?;

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, INIT_TEMPLATE)?;
    println!("Created {}", path.display());

    Ok(())
}

fn cmd_path() -> Result<()> {
    match ponder_config::user_config_path() {
        Some(path) => println!("user:    {}", path.display()),
        None => println!("user:    (no config directory)"),
    }
    println!("project: {}", PROJECT_CONFIG_FILE);
    if let Some(dir) = ponder_config::log_dir() {
        println!("logs:    {}", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_config::PonderConfig;

    #[test]
    fn test_init_template_parses() {
        let config = PonderConfig::from_toml(INIT_TEMPLATE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.llm().model.as_deref(), Some(DEFAULT_LLM_MODEL));
        assert_eq!(config.budget().effective_budget(), ponder_config::DEFAULT_BUDGET);
        assert_eq!(config.agent().effective_model(), ponder_config::DEFAULT_AGENT_MODEL);
        assert_eq!(config.search().max_results, Some(10));
    }

    #[test]
    fn test_key_status_for_keyless_backend() {
        unsafe { std::env::remove_var("VLLM_API_KEY") };
        assert_eq!(key_status(Backend::Vllm, &LlmConfig::default()), "not required");
    }

    #[test]
    fn test_local_init_path() {
        assert_eq!(init_path(true).unwrap(), PathBuf::from("ponder.toml"));
    }
}
