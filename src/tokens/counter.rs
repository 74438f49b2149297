//! Token counter implementation
//!
//! Uses tiktoken-rs for token counting compatible with OpenAI chat models.
//! The encoder is built once at startup and only read afterwards.

use anyhow::Result;
use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

/// Tokens added around every chat message: <|start|>{role}\n{content}<|end|>\n
const TOKENS_PER_MESSAGE: usize = 3;
/// Every reply is primed with <|start|>assistant<|message|>
const REPLY_PRIMING_TOKENS: usize = 3;

/// Token counter bound to one model's encoding
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Create a counter for a model, falling back to cl100k_base for unknown models
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                tracing::warn!(
                    "Unknown model '{}', falling back to cl100k_base encoder: {}",
                    model,
                    e
                );
                cl100k_base()?
            }
        };

        Ok(Self { bpe })
    }

    /// Count tokens in a text string
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Count tokens in a single chat message
    pub fn count_message_tokens(&self, role: &str, content: &str) -> usize {
        TOKENS_PER_MESSAGE + self.count_tokens(role) + self.count_tokens(content)
    }

    /// Count tokens for a complete chat prompt given as (role, content) pairs
    pub fn count_chat_tokens(&self, messages: &[(&str, &str)]) -> usize {
        messages
            .iter()
            .map(|(role, content)| self.count_message_tokens(role, content))
            .sum::<usize>()
            + REPLY_PRIMING_TOKENS
    }
}

/// Reply token budget left once the prompt is placed in the model context.
///
/// Never below one token, never above `max_response_tokens`.
pub fn response_token_budget(
    prompt_tokens: usize,
    max_model_tokens: usize,
    max_response_tokens: usize,
) -> usize {
    max_model_tokens
        .saturating_sub(prompt_tokens)
        .min(max_response_tokens)
        .max(1)
}
