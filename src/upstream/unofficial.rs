//! ChatGPT web backend client (proxy mode)
//!
//! Talks to the ChatGPT conversation endpoint through a reverse proxy using a
//! ChatGPT access token. The backend keeps the conversation; callers resume it
//! with the conversation id and parent message id of the previous reply.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    bearer_headers, error_body,
    sse::{SseDecoder, SseEvent},
    ChatMessage, ChatUpstream, ProgressFn, SendOptions, UpstreamError,
};
use crate::config::ApiModel;

pub const DEFAULT_REVERSE_PROXY_URL: &str = "https://bypass.churchless.tech/api/conversation";

const CHATGPT_MODEL: &str = "text-davinci-002-render-sha";

#[derive(Debug, Serialize)]
struct ConversationRequest<'a> {
    action: &'static str,
    messages: [ConversationMessage<'a>; 1],
    model: &'static str,
    parent_message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConversationMessage<'a> {
    id: &'a str,
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
struct MessageContent<'a> {
    content_type: &'static str,
    parts: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct ConversationEvent {
    message: Option<EventMessage>,
    conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    id: String,
    content: EventContent,
}

#[derive(Debug, Deserialize)]
struct EventContent {
    #[serde(default)]
    parts: Vec<serde_json::Value>,
}

/// Proxy-mode client authenticated with a ChatGPT access token
pub struct UnofficialProxyClient {
    client: reqwest::Client,
    url: String,
    access_token: String,
}

impl UnofficialProxyClient {
    pub fn new(client: reqwest::Client, access_token: &str, reverse_proxy_url: Option<&str>) -> Self {
        Self {
            client,
            url: reverse_proxy_url
                .unwrap_or(DEFAULT_REVERSE_PROXY_URL)
                .to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatUpstream for UnofficialProxyClient {
    fn api_model(&self) -> ApiModel {
        ApiModel::ChatGptUnofficialProxyApi
    }

    #[instrument(skip_all, fields(conversation_id = ?options.conversation_id))]
    async fn send_message(
        &self,
        text: &str,
        options: SendOptions,
        on_progress: &ProgressFn<'_>,
    ) -> Result<ChatMessage, UpstreamError> {
        let message_id = Uuid::new_v4().to_string();
        let parent_message_id = options
            .parent_message_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let body = ConversationRequest {
            action: "next",
            messages: [ConversationMessage {
                id: &message_id,
                role: "user",
                content: MessageContent {
                    content_type: "text",
                    parts: [text],
                },
            }],
            model: CHATGPT_MODEL,
            parent_message_id,
            conversation_id: options.conversation_id.clone(),
        };

        let mut headers = bearer_headers(&self.access_token)?;
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        debug!(url = %self.url, "Sending conversation request");
        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(UpstreamError::ChatGpt { status, body });
        }

        let mut result = ChatMessage::assistant_reply(Uuid::new_v4().to_string(), message_id);
        result.conversation_id = options.conversation_id;
        let mut received = false;

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        while !finished {
            let events = match stream.next().await {
                Some(chunk) => decoder.feed(&chunk?),
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for event in events {
                let data = match event {
                    SseEvent::Done => {
                        finished = true;
                        break;
                    }
                    SseEvent::Data(data) => data,
                };

                // The backend interleaves non-message events; skip what we cannot read
                let event: ConversationEvent = match serde_json::from_str(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable conversation event");
                        continue;
                    }
                };

                if let Some(conversation_id) = event.conversation_id {
                    result.conversation_id = Some(conversation_id);
                }

                let Some(message) = event.message else {
                    continue;
                };
                let Some(text) = message.content.parts.first().and_then(|p| p.as_str()) else {
                    continue;
                };

                received = true;
                result.id = message.id;
                result.text = text.to_string();
                on_progress(&result);
            }
        }

        if !received {
            return Err(UpstreamError::EmptyResponse);
        }

        Ok(result)
    }
}
