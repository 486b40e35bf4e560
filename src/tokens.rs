//! Token counting against a model's tokenizer.
//!
//! Every budget decision in [`crate::chunk`] compares numbers produced by a
//! single [`TokenCounter`], so one instance is built per run and shared by
//! reference. The production counter wraps a tiktoken BPE; anything else
//! (a Hugging Face tokenizer, a test double) only has to implement `count`.

use crate::error::MdCleanError;
use std::fmt;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Maps text to a number of model-specific tokens.
///
/// Implementations must be deterministic: the same text always yields the
/// same count for the lifetime of the counter.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// [`TokenCounter`] backed by the tiktoken vocabulary of a named model.
pub struct TiktokenCounter {
    model: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load the vocabulary used by `model` (e.g. `gpt-4` → cl100k_base).
    ///
    /// # Errors
    /// [`MdCleanError::TokenizerUnavailable`] when tiktoken does not know the
    /// model. There is no fallback estimate: a wrong count would silently
    /// break the chunk budget.
    pub fn for_model(model: &str) -> Result<Self, MdCleanError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| {
            MdCleanError::TokenizerUnavailable {
                model: model.to_string(),
                detail: e.to_string(),
            }
        })?;
        debug!("Loaded tiktoken vocabulary for '{}'", model);
        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }

    /// Model whose vocabulary this counter uses.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4_vocabulary_loads() {
        let counter = TiktokenCounter::for_model("gpt-4").expect("cl100k_base is bundled");
        assert_eq!(counter.model(), "gpt-4");
        assert_eq!(counter.count(""), 0);
        assert!(counter.count("Hello, world!") > 0);
    }

    #[test]
    fn count_is_deterministic() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        let text = "# Title\n\nSome paragraph text that is long enough to matter.";
        assert_eq!(counter.count(text), counter.count(text));
    }

    #[test]
    fn longer_text_has_more_tokens() {
        let counter = TiktokenCounter::for_model("gpt-4").unwrap();
        let short = "one sentence.";
        let long = "one sentence. ".repeat(50);
        assert!(counter.count(&long) > counter.count(short));
    }

    #[test]
    fn unknown_model_is_fatal() {
        let err = TiktokenCounter::for_model("definitely-not-a-model").unwrap_err();
        assert!(matches!(err, MdCleanError::TokenizerUnavailable { .. }));
    }
}
