//! Configuration for Ponder.
//!
//! TOML files are discovered in the user config directory and the working
//! directory, merged field by field, and checked for unusable values. API
//! keys resolve from the environment first, then the config file.

mod discovery;
mod error;
mod secrets;
mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, DiscoveryOptions, LoadedConfig, PROJECT_CONFIG_FILE, load_config,
    load_config_file, load_config_with_options, log_dir, save_config, user_config_dir,
    user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{
    ResolvedSecret, SEARCH_API_KEY_ENV, SecretSource, require_api_key, resolve_api_key,
    resolve_secret,
};
pub use types::{
    AgentSection, Backend, BudgetSection, DEFAULT_AGENT_MODEL, DEFAULT_BUDGET, DEFAULT_LLM_MODEL,
    LlmConfig, PonderConfig, SampleSection, SearchSection, TokenizerConfig,
};
