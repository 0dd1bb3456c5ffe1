//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning at load time)

use crate::{Backend, ConfigError, Result};

/// Environment variable holding the Serper search key.
pub const SEARCH_API_KEY_ENV: &str = "SERPER_API_KEY";

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a secret from `env_var`, then from `config_value`.
///
/// Empty values count as unset.
pub fn resolve_secret(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Some(ResolvedSecret {
                value,
                source: SecretSource::EnvVar(env_var.to_string()),
            });
        }
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

/// Resolve the API key for `backend`.
pub fn resolve_api_key(backend: Backend, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_secret(backend.env_var(), config_value)
}

/// Resolve the API key for `backend`, failing if the backend needs one and
/// none is set.
pub fn require_api_key(backend: Backend, config_value: Option<&str>) -> Result<Option<String>> {
    match resolve_api_key(backend, config_value) {
        Some(secret) => Ok(Some(secret.value)),
        None if backend.requires_api_key() => Err(ConfigError::ApiKeyNotFound {
            backend: backend.display_name().to_string(),
            env_var: backend.env_var().to_string(),
        }),
        None => Ok(None),
    }
}
