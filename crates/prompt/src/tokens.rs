//! Token counting for prompt-budget decisions.

use std::sync::Arc;
use tiktoken_rs::CoreBPE;

use crate::builder::END_OF_TURN;

/// Special token the chat-style sentinel is counted as.
const END_OF_TEXT: &str = "<|endoftext|>";

/// Approximate number of tokens the downstream model consumes for a text.
///
/// Implementations must be pure: the same input always yields the same count, and the
/// empty string counts as zero.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// GPT-3 byte-pair encoding (`r50k_base`). The `<|im_end|>` turn sentinel is counted as a
/// single `<|endoftext|>` special token.
#[derive(Clone)]
pub struct BpeTokenCounter {
    bpe: Arc<CoreBPE>,
}

impl BpeTokenCounter {
    /// Loads the encoder tables. Build once and share; loading is not cheap.
    pub fn new() -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::r50k_base()?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let text = text.replace(END_OF_TURN, END_OF_TEXT);
        self.bpe.encode_with_special_tokens(&text).len()
    }
}

/// Roughly four characters per token, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateTokenCounter;

impl TokenCounter for EstimateTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
