//! Errors from loading, validating and saving configuration.

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A backend that needs a key has none in the environment or config.
    #[error("no API key for {backend}: set {env_var} or `api_key` in the config file")]
    ApiKeyNotFound { backend: String, env_var: String },

    /// The value parsed but cannot be used, e.g. a zero budget.
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
