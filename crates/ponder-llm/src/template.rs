//! Chat template rendering.
//!
//! Model directories ship their prompt format as a Jinja template inside
//! `tokenizer_config.json`. Templates are rendered with `minijinja` using the
//! same whitespace rules as Hugging Face (`trim_blocks`, `lstrip_blocks`) and
//! the Python string methods those templates lean on.

use std::path::Path;

use minijinja::{Environment, ErrorKind, context};
use serde::Deserialize;

use crate::error::{LlmError, Result};
use crate::types::ChatMessage;

/// Filename of the tokenizer config inside a model directory.
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// ChatML template in the Qwen style, used when no model template is given.
///
/// With `enable_thinking` explicitly false an empty reasoning block is
/// pre-filled, otherwise the model opens its own.
pub const DEFAULT_CHAT_TEMPLATE: &str = "{% for message in messages %}<|im_start|>{{ message.role }}\n{{ message.content }}<|im_end|>\n{% endfor %}{% if add_generation_prompt %}<|im_start|>assistant\n{% if enable_thinking is defined and enable_thinking is false %}<think>\n\n</think>\n\n{% endif %}{% endif %}";

const TEMPLATE_NAME: &str = "chat";

/// Options passed to the template at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Append the header that opens an assistant turn.
    pub add_generation_prompt: bool,
    /// Let the model produce a reasoning block.
    pub enable_thinking: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            add_generation_prompt: true,
            enable_thinking: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tokenizer_config.json
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenizerConfig {
    #[serde(default)]
    chat_template: Option<TemplateField>,
    #[serde(default)]
    bos_token: Option<SpecialToken>,
    #[serde(default)]
    eos_token: Option<SpecialToken>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateField {
    Single(String),
    Named(Vec<NamedTemplate>),
}

#[derive(Debug, Deserialize)]
struct NamedTemplate {
    name: String,
    template: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecialToken {
    Plain(String),
    Added { content: String },
}

impl SpecialToken {
    fn into_content(self) -> String {
        match self {
            SpecialToken::Plain(s) => s,
            SpecialToken::Added { content } => content,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Template
// ─────────────────────────────────────────────────────────────────────────────

/// A Jinja chat template plus the special tokens it may reference.
#[derive(Debug, Clone)]
pub struct ChatTemplate {
    source: String,
    bos_token: Option<String>,
    eos_token: Option<String>,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self::from_source(DEFAULT_CHAT_TEMPLATE)
    }
}

impl ChatTemplate {
    /// Use a template string as-is.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bos_token: None,
            eos_token: None,
        }
    }

    /// Load the template from a `tokenizer_config.json` file or a model
    /// directory containing one.
    pub fn from_tokenizer_config(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(TOKENIZER_CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        let raw = std::fs::read_to_string(&file).map_err(|e| {
            LlmError::Template(format!("failed to read {}: {}", file.display(), e))
        })?;
        let template = Self::from_config_json(&raw)?;

        tracing::debug!(path = %file.display(), "Loaded chat template");
        Ok(template)
    }

    /// Parse the template out of `tokenizer_config.json` contents.
    pub fn from_config_json(raw: &str) -> Result<Self> {
        let config: TokenizerConfig = serde_json::from_str(raw)?;

        let source = match config.chat_template {
            Some(TemplateField::Single(s)) => s,
            Some(TemplateField::Named(list)) => list
                .into_iter()
                .find(|t| t.name == "default")
                .map(|t| t.template)
                .ok_or_else(|| {
                    LlmError::Template("no template named 'default' in chat_template".to_string())
                })?,
            None => {
                return Err(LlmError::Template(
                    "tokenizer config has no chat_template".to_string(),
                ));
            }
        };

        Ok(Self {
            source,
            bos_token: config.bos_token.map(SpecialToken::into_content),
            eos_token: config.eos_token.map(SpecialToken::into_content),
        })
    }

    /// The raw template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render `messages` into a prompt string.
    pub fn render(&self, messages: &[ChatMessage], options: &TemplateOptions) -> Result<String> {
        let env = environment();
        let tmpl = env.template_from_named_str(TEMPLATE_NAME, &self.source)?;

        let rendered = tmpl.render(context! {
            messages => messages,
            add_generation_prompt => options.add_generation_prompt,
            enable_thinking => options.enable_thinking,
            bos_token => self.bos_token.as_deref().unwrap_or(""),
            eos_token => self.eos_token.as_deref().unwrap_or(""),
        })?;
        Ok(rendered)
    }
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
    env.add_function("raise_exception", raise_exception);
    env
}

fn raise_exception(message: String) -> std::result::Result<String, minijinja::Error> {
    Err(minijinja::Error::new(ErrorKind::InvalidOperation, message))
}
