//! OpenAI chat completions client (direct mode)
//!
//! Sends the user message behind a fixed system preamble to
//! `/v1/chat/completions` with `stream: true` and folds the streamed deltas
//! into a single reply.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    bearer_headers, error_body,
    sse::{SseDecoder, SseEvent},
    ChatMessage, ChatUpstream, ProgressFn, Role, SendOptions, UpstreamError,
};
use crate::config::ApiModel;
use crate::tokens::{response_token_budget, TokenCounter};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com";

const TEMPERATURE: f64 = 0.8;
const TOP_P: f64 = 1.0;
const MAX_MODEL_TOKENS: usize = 4000;
const MAX_RESPONSE_TOKENS: usize = 1000;

/// System preamble sent ahead of every message
pub fn system_message(today: NaiveDate) -> String {
    format!(
        "You are ChatGPT, a large language model trained by OpenAI. Answer as concisely as possible.\nCurrent date: {}\n",
        today.format("%Y-%m-%d")
    )
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    top_p: f64,
    max_tokens: usize,
    stream: bool,
    messages: [RequestMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    id: String,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    role: Option<Role>,
    content: Option<String>,
}

/// Direct-mode client authenticated with an OpenAI API key
pub struct OpenAiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_message: String,
    counter: TokenCounter,
}

impl OpenAiClient {
    /// Create a new client; the preamble date is fixed at construction
    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        api_base_url: Option<&str>,
        model: &str,
    ) -> anyhow::Result<Self> {
        let base_url = api_base_url.unwrap_or(DEFAULT_API_BASE_URL).trim_end_matches('/');

        Ok(Self {
            client,
            url: format!("{}/v1/chat/completions", base_url),
            api_key: api_key.to_string(),
            model: model.to_string(),
            system_message: system_message(Utc::now().date_naive()),
            counter: TokenCounter::for_model(model)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request<'a>(&'a self, text: &'a str) -> CompletionRequest<'a> {
        let prompt_tokens = self
            .counter
            .count_chat_tokens(&[("system", self.system_message.as_str()), ("user", text)]);

        CompletionRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: response_token_budget(prompt_tokens, MAX_MODEL_TOKENS, MAX_RESPONSE_TOKENS),
            stream: true,
            messages: [
                RequestMessage {
                    role: Role::System,
                    content: &self.system_message,
                },
                RequestMessage {
                    role: Role::User,
                    content: text,
                },
            ],
        }
    }
}

#[async_trait]
impl ChatUpstream for OpenAiClient {
    fn api_model(&self) -> ApiModel {
        ApiModel::ChatGptApi
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn send_message(
        &self,
        text: &str,
        options: SendOptions,
        on_progress: &ProgressFn<'_>,
    ) -> Result<ChatMessage, UpstreamError> {
        let message_id = Uuid::new_v4().to_string();
        // No history is kept, so the parent id only links replies for the caller
        debug!(parent_message_id = ?options.parent_message_id, "Sending chat completion request");

        let response = self
            .client
            .post(&self.url)
            .headers(bearer_headers(&self.api_key)?)
            .json(&self.build_request(text))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(UpstreamError::OpenAi { status, body });
        }

        let mut result = ChatMessage::assistant_reply(Uuid::new_v4().to_string(), message_id);
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

                let detail: serde_json::Value = serde_json::from_str(&data)?;
                let chunk: CompletionChunk = serde_json::from_value(detail.clone())?;

                // Usage and filter chunks carry no choices
                let Some(delta) = chunk.choices.into_iter().next().map(|c| c.delta) else {
                    continue;
                };

                received = true;
                result.id = chunk.id;
                if let Some(role) = delta.role {
                    result.role = role;
                }
                if let Some(content) = delta.content {
                    result.text.push_str(&content);
                }
                result.detail = Some(detail);
                on_progress(&result);
            }
        }

        if !received {
            return Err(UpstreamError::EmptyResponse);
        }

        result.text = result.text.trim().to_string();
        Ok(result)
    }
}
