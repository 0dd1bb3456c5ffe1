//! CLI command handlers.

pub mod agent;
pub mod budget;
pub mod config;
pub mod sample;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use ponder_config::{Backend, DEFAULT_LLM_MODEL, LlmConfig, LoadedConfig, PonderConfig};
use ponder_llm::{ChatTemplate, HfTokenizer, OpenAiBackend, OpenAiConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Discovered and merged configuration.
    pub loaded: LoadedConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn config(&self) -> &PonderConfig {
        &self.loaded.config
    }
}

/// Model-server and tokenizer flags shared by `budget` and `sample`.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// tokenizer.json, or a model directory containing it
    #[arg(long, env = "PONDER_TOKENIZER")]
    pub tokenizer: Option<PathBuf>,

    /// tokenizer_config.json (or directory) holding the chat template
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Completion server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name on the server
    #[arg(long)]
    pub model: Option<String>,
}

/// Everything a sampling run needs.
pub struct Resources {
    pub generator: OpenAiBackend,
    pub tokenizer: HfTokenizer,
    pub template: ChatTemplate,
}

impl ModelArgs {
    /// The `[llm]` section with flag overrides applied.
    pub fn llm(&self, base: LlmConfig) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.clone().or(base.base_url),
            model: self.model.clone().or(base.model),
            ..base
        }
    }

    /// Load the tokenizer and template and connect to the server.
    pub fn resources(&self, ctx: &Context) -> Result<Resources> {
        let config = ctx.config();
        let section = config.tokenizer();
        let tokenizer_path = self.tokenizer.clone().or(section.path.clone());
        let template_path = self.template.clone().or(section.template.clone());

        let tokenizer = load_tokenizer(tokenizer_path.as_deref())?;
        let template = load_template(template_path.as_deref(), tokenizer_path.as_deref())?;

        let llm = self.llm(config.llm());
        let server = server_config(&llm, Backend::Vllm, DEFAULT_LLM_MODEL, 0)?;
        tracing::debug!(base_url = %server.base_url, model = ?server.model, "Using completion server");
        let generator = OpenAiBackend::new(server)?;

        Ok(Resources {
            generator,
            tokenizer,
            template,
        })
    }
}

/// Build client settings for an OpenAI-compatible server from a config
/// section.
pub fn server_config(
    llm: &LlmConfig,
    fallback: Backend,
    default_model: &str,
    default_retries: u32,
) -> Result<OpenAiConfig> {
    let backend = llm.effective_backend(fallback);
    let api_key = ponder_config::require_api_key(backend, llm.api_key.as_deref())?;

    let mut config = OpenAiConfig::vllm()
        .with_name(backend.name())
        .with_base_url(llm.effective_base_url(fallback))
        .with_model(llm.model.as_deref().unwrap_or(default_model))
        .with_max_retries(llm.retry_max.unwrap_or(default_retries));
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    if let Some(secs) = llm.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Load the tokenizer from `path` (a `tokenizer.json` or model directory).
pub fn load_tokenizer(path: Option<&Path>) -> Result<HfTokenizer> {
    let path = path.context(
        "no tokenizer configured: pass --tokenizer or set `path` under [tokenizer]",
    )?;
    Ok(HfTokenizer::from_path(path)?)
}

/// Pick the chat template: an explicit location, else the model directory's
/// `tokenizer_config.json` (next to `tokenizer.json` if a file was given),
/// else the built-in ChatML template.
pub fn load_template(template: Option<&Path>, tokenizer: Option<&Path>) -> Result<ChatTemplate> {
    if let Some(path) = template {
        return Ok(ChatTemplate::from_tokenizer_config(path)?);
    }

    let candidate: Option<PathBuf> = tokenizer.map(|path| {
        if path.is_dir() {
            path.join(ponder_llm::TOKENIZER_CONFIG_FILE)
        } else {
            path.with_file_name(ponder_llm::TOKENIZER_CONFIG_FILE)
        }
    });

    match candidate {
        Some(path) if path.is_file() => Ok(ChatTemplate::from_tokenizer_config(&path)?),
        _ => {
            tracing::info!("No tokenizer_config.json found, using the built-in chat template");
            Ok(ChatTemplate::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults_to_local_vllm() {
        unsafe { std::env::remove_var("VLLM_API_KEY") };
        let config = server_config(&LlmConfig::default(), Backend::Vllm, "m", 0).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.model.as_deref(), Some("m"));
        assert_eq!(config.name, "vllm");
        assert_eq!(config.max_retries, 0);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_server_config_uses_section_values() {
        let llm = LlmConfig {
            backend: Some(Backend::Siliconflow),
            model: Some("Qwen/Qwen3-8B".to_string()),
            api_key: Some("sk-test".to_string()),
            timeout_secs: Some(5),
            retry_max: Some(2),
            ..Default::default()
        };
        let config = server_config(&llm, Backend::Vllm, "unused", 0).unwrap();
        assert_eq!(config.base_url, "https://api.siliconflow.cn/v1");
        assert_eq!(config.model.as_deref(), Some("Qwen/Qwen3-8B"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert!(config.api_key.is_some());
    }

    #[test]
    fn test_model_args_override_section() {
        let args = ModelArgs {
            model: Some("flag-model".to_string()),
            ..Default::default()
        };
        let base = LlmConfig {
            model: Some("file-model".to_string()),
            base_url: Some("http://box:8000/v1".to_string()),
            ..Default::default()
        };
        let llm = args.llm(base);
        assert_eq!(llm.model.as_deref(), Some("flag-model"));
        assert_eq!(llm.base_url.as_deref(), Some("http://box:8000/v1"));
    }

    #[test]
    fn test_missing_tokenizer_is_reported() {
        let err = load_tokenizer(None).unwrap_err();
        assert!(err.to_string().contains("--tokenizer"));
    }

    #[test]
    fn test_template_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let template = load_template(None, Some(dir.path())).unwrap();
        assert_eq!(template.source(), ponder_llm::DEFAULT_CHAT_TEMPLATE);
        let template = load_template(None, None).unwrap();
        assert_eq!(template.source(), ponder_llm::DEFAULT_CHAT_TEMPLATE);
    }

    #[test]
    fn test_template_found_next_to_tokenizer_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tokenizer_config.json"),
            r#"{"chat_template": "{{ messages[0].content }}"}"#,
        )
        .unwrap();
        let tokenizer_file = dir.path().join("tokenizer.json");
        let template = load_template(None, Some(&tokenizer_file)).unwrap();
        assert_eq!(template.source(), "{{ messages[0].content }}");
    }
}
