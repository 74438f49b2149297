//! Token counting module
//!
//! Provides prompt token counting with tiktoken-rs, used to size the reply
//! budget of direct-mode requests.

pub mod counter;

pub use counter::{response_token_budget, TokenCounter};
