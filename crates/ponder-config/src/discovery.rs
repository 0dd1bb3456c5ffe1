//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `$PONDER_CONFIG_DIR/config.toml`, else `~/.config/ponder/config.toml`
//! 2. `./ponder.toml` (project-local)
//! 3. An explicit `--config FILE`
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, PonderConfig, Result};

/// Project-local config filename.
pub const PROJECT_CONFIG_FILE: &str = "ponder.toml";

/// Config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "ponder";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "PONDER_CONFIG_DIR";

/// Where a config layer was looked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: PonderConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g., plaintext API keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Options controlling discovery. Defaults search the real locations.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Overrides `PONDER_CONFIG_DIR` and the platform default.
    pub config_dir: Option<PathBuf>,
    /// Directory holding `ponder.toml`. Defaults to the working directory.
    pub project_dir: Option<PathBuf>,
    /// File loaded last. Unlike discovered layers it must exist and parse.
    pub explicit_file: Option<PathBuf>,
}

/// Load configuration from the default locations.
pub fn load_config() -> Result<LoadedConfig> {
    load_config_with_options(&DiscoveryOptions::default())
}

/// Load configuration with explicit control over each location.
pub fn load_config_with_options(options: &DiscoveryOptions) -> Result<LoadedConfig> {
    let mut config = PonderConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config
    let user_config_path = match &options.config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Project-local config
    let project_path = options
        .project_dir
        .as_ref()
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    // 3. Explicit file
    if let Some(path) = &options.explicit_file {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.clone(),
            loaded: true,
        });
    }

    check_plaintext_keys(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load and validate config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<PonderConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = PonderConfig::from_toml(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &PonderConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory: `PONDER_CONFIG_DIR`, else the platform
/// config dir plus `ponder`.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory for log files.
pub fn log_dir() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join("logs"))
}

/// Merge one discovered layer. Missing files are skipped; files that fail
/// to parse or validate become warnings.
fn load_layer(config: &mut PonderConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

fn check_plaintext_keys(config: &PonderConfig, warnings: &mut Vec<String>) {
    let sections = [
        ("llm", config.llm.as_ref().and_then(|s| s.api_key.as_ref())),
        ("agent", config.agent.as_ref().and_then(|s| s.api_key.as_ref())),
        ("search", config.search.as_ref().and_then(|s| s.api_key.as_ref())),
    ];
    for (name, key) in sections {
        if key.is_some() {
            warnings.push(format!(
                "[{}] contains a plaintext API key. Consider using an environment variable instead.",
                name
            ));
        }
    }
}
