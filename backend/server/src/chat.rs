//! # Chat Assistant
//!
//! Proxy in front of a Gemini-style `streamGenerateContent` endpoint.
//!
//! ## Request
//! - Conversation history, the new message, an optional base64 image
//! - The configured system instruction is attached server side
//! - The upstream API rejects a history that opens with a model turn, so
//!   leading model turns are dropped
//!
//! ## Response
//! - Upstream answers with server-sent events (`alt=sse`)
//! - Each event carries a JSON candidate; its text parts are forwarded to the
//!   caller as soon as they arrive, in order, as a chunked `text/plain` body
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::{Stream, StreamExt, future, stream};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{config::ChatConfig, error::AppError};

pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub message: String,
    pub image: Option<ChatImage>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.message.trim().is_empty() && self.image.is_none() {
            return Err(AppError::MissingField("message"));
        }

        if let Some(image) = &self.image {
            if !image.mime_type.starts_with("image/") {
                return Err(AppError::MalformedPayload(format!(
                    "unsupported image type {}",
                    image.mime_type
                )));
            }

            let decoded = STANDARD
                .decode(image.data.trim())
                .map_err(|_| AppError::MalformedPayload("image is not valid base64".to_string()))?;

            if decoded.len() > MAX_IMAGE_BYTES {
                return Err(AppError::MalformedPayload("image is larger than 4 MiB".to_string()));
            }
        }

        Ok(())
    }
}

pub fn trim_history(history: &[ChatTurn]) -> &[ChatTurn] {
    let start = history
        .iter()
        .position(|turn| turn.role == ChatRole::User)
        .unwrap_or(history.len());

    &history[start..]
}

pub fn build_body(system_prompt: &str, request: &ChatRequest) -> Value {
    let mut contents: Vec<Value> = trim_history(&request.history)
        .iter()
        .filter(|turn| !turn.text.trim().is_empty())
        .map(|turn| {
            json!({
                "role": turn.role.as_str(),
                "parts": [{ "text": turn.text }]
            })
        })
        .collect();

    let mut parts = Vec::new();
    if !request.message.trim().is_empty() {
        parts.push(json!({ "text": request.message }));
    }
    if let Some(image) = &request.image {
        parts.push(json!({
            "inlineData": { "mimeType": image.mime_type, "data": image.data.trim() }
        }));
    }
    contents.push(json!({ "role": "user", "parts": parts }));

    json!({
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
        "contents": contents
    })
}

/// Incremental server-sent-events reader; yields the `data:` payload of each
/// complete event. Bytes are only decoded once a full line has arrived, so a
/// chunk boundary inside a multi-byte character is harmless.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }

        events
    }

    /// An event left open when the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        if let Some(data) = rest.trim_end_matches(['\n', '\r']).strip_prefix("data:") {
            self.data.push(data.trim_start().to_string());
        }

        (!self.data.is_empty()).then(|| std::mem::take(&mut self.data).join("\n"))
    }
}

pub fn extract_text(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    (!text.is_empty()).then_some(text)
}

pub struct ChatClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, anyhow::Error> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_url, self.model
        )
    }

    pub async fn stream(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<String, AppError>> + Send + 'static, AppError> {
        let body = build_body(&self.system_prompt, request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Chat(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Chat(format!("{status}: {}", detail.trim())));
        }

        info!("Chat stream opened ({} history turns)", request.history.len());

        let events = response
            .bytes_stream()
            .map(Some)
            .chain(stream::once(future::ready(None)))
            .scan(SseDecoder::default(), |decoder, chunk| {
                let items: Vec<Result<String, AppError>> = match chunk {
                    Some(Ok(bytes)) => decoder.push(&bytes).into_iter().map(Ok).collect(),
                    Some(Err(e)) => vec![Err(AppError::Chat(e.to_string()))],
                    None => decoder.finish().into_iter().map(Ok).collect(),
                };

                future::ready(Some(stream::iter(items)))
            })
            .flatten();

        Ok(events.filter_map(|event| {
            future::ready(match event {
                Ok(payload) => extract_text(&payload).map(Ok),
                Err(e) => Some(Err(e)),
            })
        }))
    }
}
