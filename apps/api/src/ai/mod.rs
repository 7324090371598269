//! AI client: the single point of entry for remote model calls.
//!
//! No other module talks to the Anthropic API directly. Text enhancement and
//! document extraction both go through `AiClient`, which owns retries,
//! timeouts and the mapping of transport/API failures onto `AiError`.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod enhance;
pub mod extraction;
pub mod handlers;
pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used for every call. Not configurable on purpose.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_RETRIES: u32 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service credential is not configured")]
    MissingCredential,

    #[error("AI service rejected the credential")]
    Auth,

    #[error("AI service quota exceeded")]
    QuotaExceeded,

    #[error("AI response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("could not reach the AI service: {message}")]
    Connectivity { certificate: bool, message: String },

    #[error("AI service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI service returned empty content")]
    EmptyContent,

    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

impl AiError {
    /// Message safe to show to the user. Each kind gets its own wording.
    pub fn user_message(&self) -> String {
        match self {
            AiError::MissingCredential => {
                "The AI service is not configured. Add ANTHROPIC_API_KEY to the server environment."
                    .to_string()
            }
            AiError::Auth => {
                "AI service authentication failed. Please check the API key configuration."
                    .to_string()
            }
            AiError::QuotaExceeded => {
                "AI service quota exceeded. Please try again later.".to_string()
            }
            AiError::MalformedResponse(_) => {
                "Failed to read the AI response. The AI did not return valid JSON.".to_string()
            }
            AiError::Connectivity {
                certificate: true, ..
            } => "Secure connection to the AI service failed. Check your network or firewall settings and try again later."
                .to_string(),
            AiError::Connectivity { .. } => {
                "Could not reach the AI service. Check your connection and try again.".to_string()
            }
            AiError::Api { .. } => {
                "The AI service could not process this request. Please try again.".to_string()
            }
            AiError::EmptyContent => {
                "The AI service returned no content. Please try again.".to_string()
            }
            AiError::InvalidUpload(msg) => msg.clone(),
        }
    }

    /// Only quota errors are worth retrying later; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::QuotaExceeded)
    }
}

/// Maps a non-success HTTP status and body onto the error taxonomy.
fn classify_status(status: StatusCode, body: String) -> AiError {
    match status.as_u16() {
        401 | 403 => AiError::Auth,
        429 => AiError::QuotaExceeded,
        400 if body.contains("credit balance") || body.contains("quota") => AiError::QuotaExceeded,
        code => {
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            AiError::Api {
                status: code,
                message,
            }
        }
    }
}

fn classify_transport(err: &reqwest::Error) -> AiError {
    let message = format!("{err:#}");
    let lower = message.to_ascii_lowercase();
    AiError::Connectivity {
        certificate: lower.contains("certificate") || lower.contains("ssl") || lower.contains("tls"),
        message,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

/// A base64-encoded image attached to a prompt.
#[derive(Debug, Clone, Copy)]
pub struct ImageAttachment<'a> {
    pub media_type: &'a str,
    pub data_base64: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AiResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AiResponse {
    /// Text of the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Sampling settings for one call.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AiClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl AiClient {
    /// An absent key is not a startup error: calls fail with
    /// `AiError::MissingCredential` instead.
    pub fn new(api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Points the client at another Messages-compatible endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Makes one Messages API call. Retries 429 and 5xx responses and
    /// transport failures with exponential backoff.
    pub async fn call(
        &self,
        system: &str,
        prompt: &str,
        image: Option<ImageAttachment<'_>>,
        options: CallOptions,
    ) -> Result<AiResponse, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingCredential)?;

        let mut content = Vec::with_capacity(2);
        if let Some(image) = image {
            content.push(ContentPart::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: image.media_type,
                    data: image.data_base64,
                },
            });
        }
        content.push(ContentPart::Text { text: prompt });

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "AI call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let err = classify_transport(&e);
                    // Certificate problems do not fix themselves between attempts.
                    if matches!(err, AiError::Connectivity { certificate: true, .. }) {
                        return Err(err);
                    }
                    last_error = Some(err);
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), body = %body, "AI API returned a retryable status");
                last_error = Some(classify_status(status, body));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status, body));
            }

            let ai_response: AiResponse = response
                .json()
                .await
                .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

            debug!(
                input_tokens = ai_response.usage.input_tokens,
                output_tokens = ai_response.usage.output_tokens,
                "AI call succeeded"
            );

            return Ok(ai_response);
        }

        Err(last_error.unwrap_or(AiError::QuotaExceeded))
    }

    /// Calls the model and returns its trimmed text.
    pub async fn call_text(
        &self,
        system: &str,
        prompt: &str,
        options: CallOptions,
    ) -> Result<String, AiError> {
        let response = self.call(system, prompt, None, options).await?;
        let text = response.text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(AiError::EmptyContent);
        }
        Ok(text.to_string())
    }

    /// Calls the model and deserializes its text response as JSON.
    /// The prompt must instruct the model to return JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        image: Option<ImageAttachment<'_>>,
        options: CallOptions,
    ) -> Result<T, AiError> {
        let response = self.call(system, prompt, image, options).await?;
        let text = response.text().ok_or(AiError::EmptyContent)?;
        parse_json_reply(text)
    }
}

/// Parses model output as JSON once surrounding code fences are removed.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(AiError::EmptyContent);
    }
    serde_json::from_str(text).map_err(|e| AiError::MalformedResponse(e.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}
