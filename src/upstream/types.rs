//! Message types shared by the upstream clients

use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message produced by the upstream, relayed as progress and as the final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub role: Role,
    /// Id of the user message this reply answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Raw upstream payload of the latest update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ChatMessage {
    /// Empty assistant reply to the given user message
    pub fn assistant_reply(id: String, parent_message_id: String) -> Self {
        Self {
            id,
            text: String::new(),
            role: Role::Assistant,
            parent_message_id: Some(parent_message_id),
            conversation_id: None,
            detail: None,
        }
    }
}

/// Continuation options handed to an upstream client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<String>,
}
