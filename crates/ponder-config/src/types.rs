//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [llm]         # completion server for budget / sample runs
//! [tokenizer]   # tokenizer.json and chat template locations
//! [budget]      # thinking-budget loop
//! [sample]      # single-pass sampling
//! [agent]       # ReAct agent and its chat server
//! [search]      # web search tool
//! ```
//!
//! Every field is optional so partial files (project-local overrides) can
//! be layered. The `effective_*` accessors supply defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Thinking budget used when none is configured.
pub const DEFAULT_BUDGET: u32 = 32768;
/// Completion-server model used when none is configured.
pub const DEFAULT_LLM_MODEL: &str = "Qwen/Qwen3-14B";
/// Chat model used by the agent when none is configured.
pub const DEFAULT_AGENT_MODEL: &str = "Qwen/Qwen3-30B-A3B-Instruct-2507";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PonderConfig {
    pub llm: Option<LlmConfig>,
    pub tokenizer: Option<TokenizerConfig>,
    pub budget: Option<BudgetSection>,
    pub sample: Option<SampleSection>,
    pub agent: Option<AgentSection>,
    pub search: Option<SearchSection>,
}

impl PonderConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections merge field by field, so a project file can override one
    /// value without repeating the rest of the section.
    pub fn merge(&mut self, other: PonderConfig) {
        merge_section(&mut self.llm, other.llm, LlmConfig::merge);
        merge_section(&mut self.tokenizer, other.tokenizer, TokenizerConfig::merge);
        merge_section(&mut self.budget, other.budget, BudgetSection::merge);
        merge_section(&mut self.sample, other.sample, SampleSection::merge);
        merge_section(&mut self.agent, other.agent, AgentSection::merge);
        merge_section(&mut self.search, other.search, SearchSection::merge);
    }

    /// The `[llm]` section, or defaults.
    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    pub fn tokenizer(&self) -> TokenizerConfig {
        self.tokenizer.clone().unwrap_or_default()
    }

    pub fn budget(&self) -> BudgetSection {
        self.budget.clone().unwrap_or_default()
    }

    pub fn sample(&self) -> SampleSection {
        self.sample.clone().unwrap_or_default()
    }

    pub fn agent(&self) -> AgentSection {
        self.agent.clone().unwrap_or_default()
    }

    pub fn search(&self) -> SearchSection {
        self.search.clone().unwrap_or_default()
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(budget) = &self.budget {
            if budget.budget == Some(0) {
                return Err(crate::ConfigError::invalid(
                    "budget.budget",
                    "must be a positive number of tokens",
                ));
            }
            if budget.max_rounds == Some(0) {
                return Err(crate::ConfigError::invalid(
                    "budget.max_rounds",
                    "must be at least 1",
                ));
            }
        }
        if let Some(agent) = &self.agent {
            if agent.max_iterations == Some(0) {
                return Err(crate::ConfigError::invalid(
                    "agent.max_iterations",
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
    let Some(layer) = other else {
        return;
    };
    match base {
        Some(existing) => merge(existing, layer),
        None => *base = Some(layer),
    }
}

fn take<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier.
    pub model: Option<String>,
    /// Custom API base URL.
    pub base_url: Option<String>,
    /// API key (prefer an environment variable; warns if set here).
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum retry attempts for transient failures.
    pub retry_max: Option<u32>,
}

impl LlmConfig {
    fn merge(&mut self, other: LlmConfig) {
        take(&mut self.backend, other.backend);
        take(&mut self.model, other.model);
        take(&mut self.base_url, other.base_url);
        take(&mut self.api_key, other.api_key);
        take(&mut self.timeout_secs, other.timeout_secs);
        take(&mut self.retry_max, other.retry_max);
    }

    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Backend, defaulting to `fallback`.
    pub fn effective_backend(&self, fallback: Backend) -> Backend {
        self.backend.unwrap_or(fallback)
    }

    /// Base URL, defaulting to the backend's public endpoint.
    pub fn effective_base_url(&self, fallback: Backend) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.effective_backend(fallback).default_base_url().to_string())
    }
}

/// Supported server flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Openai,
    Vllm,
    Siliconflow,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Vllm => "VLLM_API_KEY",
            Backend::Siliconflow => "SILICONFLOW_API_KEY",
        }
    }

    /// Default API base URL.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Backend::Openai => "https://api.openai.com/v1",
            Backend::Vllm => "http://localhost:8000/v1",
            Backend::Siliconflow => "https://api.siliconflow.cn/v1",
        }
    }

    /// Whether requests fail without a key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Backend::Vllm)
    }

    /// Config-file name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Openai => "openai",
            Backend::Vllm => "vllm",
            Backend::Siliconflow => "siliconflow",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Openai => "OpenAI",
            Backend::Vllm => "vLLM",
            Backend::Siliconflow => "SiliconFlow",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// Where to find the tokenizer and chat template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// `tokenizer.json`, or a model directory containing it.
    pub path: Option<PathBuf>,
    /// `tokenizer_config.json` (or a directory) holding `chat_template`.
    /// Defaults to `path`.
    pub template: Option<PathBuf>,
}

impl TokenizerConfig {
    fn merge(&mut self, other: TokenizerConfig) {
        take(&mut self.path, other.path);
        take(&mut self.template, other.template);
    }

    /// Template location, falling back to the tokenizer path.
    pub fn effective_template(&self) -> Option<&PathBuf> {
        self.template.as_ref().or(self.path.as_ref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sampling
// ─────────────────────────────────────────────────────────────────────────────

/// `[budget]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSection {
    /// Thinking-token budget.
    pub budget: Option<u32>,
    /// Round ceiling.
    pub max_rounds: Option<u32>,
    pub temperature: Option<f32>,
    /// Token cap for the answer call.
    pub final_max_tokens: Option<u32>,
    /// Where transcripts are written. Unset means the working directory.
    pub output_dir: Option<PathBuf>,
}

impl BudgetSection {
    fn merge(&mut self, other: BudgetSection) {
        take(&mut self.budget, other.budget);
        take(&mut self.max_rounds, other.max_rounds);
        take(&mut self.temperature, other.temperature);
        take(&mut self.final_max_tokens, other.final_max_tokens);
        take(&mut self.output_dir, other.output_dir);
    }

    pub fn effective_budget(&self) -> u32 {
        self.budget.unwrap_or(DEFAULT_BUDGET)
    }
}

/// `[sample]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSection {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub output_dir: Option<PathBuf>,
}

impl SampleSection {
    fn merge(&mut self, other: SampleSection) {
        take(&mut self.max_tokens, other.max_tokens);
        take(&mut self.temperature, other.temperature);
        take(&mut self.output_dir, other.output_dir);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

/// `[agent]` section. Connection fields mirror `[llm]`; the agent talks to
/// a chat endpoint, usually a hosted one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub backend: Option<Backend>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AgentSection {
    fn merge(&mut self, other: AgentSection) {
        take(&mut self.backend, other.backend);
        take(&mut self.model, other.model);
        take(&mut self.base_url, other.base_url);
        take(&mut self.api_key, other.api_key);
        take(&mut self.max_iterations, other.max_iterations);
        take(&mut self.temperature, other.temperature);
        take(&mut self.max_tokens, other.max_tokens);
    }

    /// Connection settings as an [`LlmConfig`].
    pub fn llm(&self) -> LlmConfig {
        LlmConfig {
            backend: self.backend,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: None,
            retry_max: None,
        }
    }

    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_AGENT_MODEL)
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Serper API key. Without one, search falls back to DuckDuckGo.
    pub api_key: Option<String>,
    pub max_results: Option<usize>,
}

impl SearchSection {
    fn merge(&mut self, other: SearchSection) {
        take(&mut self.api_key, other.api_key);
        take(&mut self.max_results, other.max_results);
    }
}
