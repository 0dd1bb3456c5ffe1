//! Token counting.
//!
//! Token counts are derived, never stored: callers re-encode whatever span
//! they need to measure.

use std::path::Path;

use crate::error::{LlmError, Result};

/// Filename of a Hugging Face fast tokenizer inside a model directory.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Anything that can turn text into model-vocabulary token ids.
pub trait TokenCounter: Send + Sync {
    /// Encode `text` into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hugging Face Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// A Hugging Face `tokenizers` tokenizer.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    add_special_tokens: bool,
}

impl HfTokenizer {
    /// Load from a `tokenizer.json` file or a model directory containing one.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(TOKENIZER_FILE)
        } else {
            path.to_path_buf()
        };

        let inner = tokenizers::Tokenizer::from_file(&file).map_err(|e| {
            LlmError::Tokenizer(format!(
                "failed to load tokenizer from {}: {}",
                file.display(),
                e
            ))
        })?;

        tracing::debug!(path = %file.display(), "Loaded tokenizer");

        Ok(Self {
            inner,
            add_special_tokens: true,
        })
    }

    /// Control whether the post-processor's special tokens are added.
    ///
    /// On by default, matching what `tokenizer(text)` does in `transformers`.
    pub fn with_special_tokens(mut self, add: bool) -> Self {
        self.add_special_tokens = add;
        self
    }
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("vocab_size", &self.inner.get_vocab_size(true))
            .field("add_special_tokens", &self.add_special_tokens)
            .finish()
    }
}

impl TokenCounter for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, self.add_special_tokens)
            .map_err(|e| LlmError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Whitespace Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// One token per whitespace-separated word.
///
/// Deterministic and dependency-free; used for dry runs without a model
/// directory and in tests where exact counts matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl TokenCounter for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text
            .split_whitespace()
            .map(|word| {
                // FNV-1a folded to 32 bits; ids only need to be stable.
                word.bytes().fold(0x811c_9dc5u32, |hash, b| {
                    (hash ^ u32::from(b)).wrapping_mul(0x0100_0193)
                })
            })
            .collect())
    }

    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}
