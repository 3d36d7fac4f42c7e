//! Client for the OpenAI-compatible chat-completions gateway.

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use regex::Regex;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::Config;

#[derive(Debug, Clone, Error)]
pub enum AiGatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited, try again in a few moments")]
    RateLimited,
    #[error("AI credits exhausted")]
    CreditsExhausted,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("empty response from the AI gateway")]
    EmptyResponse,
    #[error("no image was generated")]
    NoImage,
    #[error("missing api key: AI_GATEWAY_API_KEY environment variable not set")]
    MissingApiKey,
}

impl AiGatewayError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            modalities: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    images: Vec<ImagePart>,
}

#[derive(Debug, Deserialize)]
struct ImagePart {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<i64>,
}

/// Text answer of a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<i64>,
}

/// Anything that can answer chat-completion and image requests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<Completion, AiGatewayError>;

    /// Returns the URL (often a `data:` URL) of the generated image.
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<String, AiGatewayError>;
}

#[derive(Debug)]
pub struct AiGatewayClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl AiGatewayClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self, AiGatewayError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("preproduction/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AiGatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AiGatewayError> {
        let api_key = config
            .gateway_api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()));
        Self::new(&config.gateway_url, api_key)
    }

    async fn post_with_retry(&self, request: &ChatRequest) -> Result<ChatResponse, AiGatewayError> {
        (|| async { self.send_request(request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &AiGatewayError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "AI gateway call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AiGatewayError> {
        let api_key = self.api_key.as_ref().ok_or(AiGatewayError::MissingApiKey)?;

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        debug!(status = %res.status(), model = %request.model, "AI gateway responded");

        match res.status() {
            s if s.is_success() => {
                let body = res.text().await.map_err(map_reqwest_error)?;
                if body.trim().is_empty() {
                    return Err(AiGatewayError::EmptyResponse);
                }
                serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
                    tracing::error!(
                        json_error = %e,
                        body_preview = %body.chars().take(500).collect::<String>(),
                        "Failed to parse AI gateway response"
                    );
                    AiGatewayError::Serde(e.to_string())
                })
            }
            StatusCode::UNAUTHORIZED => Err(AiGatewayError::InvalidApiKey),
            StatusCode::PAYMENT_REQUIRED => Err(AiGatewayError::CreditsExhausted),
            StatusCode::TOO_MANY_REQUESTS => Err(AiGatewayError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                tracing::error!(status, body = %body, "AI gateway error");
                Err(AiGatewayError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for AiGatewayClient {
    async fn chat(&self, request: ChatRequest) -> Result<Completion, AiGatewayError> {
        let response = self.post_with_retry(&request).await?;
        let tokens_used = response.usage.as_ref().and_then(|u| u.total_tokens);
        let model = response.model.clone().unwrap_or_else(|| request.model.clone());

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AiGatewayError::EmptyResponse)?;

        Ok(Completion {
            content,
            model,
            tokens_used,
        })
    }

    async fn generate_image(&self, model: &str, prompt: &str) -> Result<String, AiGatewayError> {
        let mut request = ChatRequest::new(model, vec![ChatMessage::user(prompt)]);
        request.modalities = Some(vec!["image".to_string(), "text".to_string()]);

        let response = self.post_with_retry(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.images.into_iter().next())
            .map(|image| image.image_url.url)
            .ok_or(AiGatewayError::NoImage)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AiGatewayError {
    if e.is_timeout() {
        AiGatewayError::Timeout
    } else {
        AiGatewayError::Transport(e.to_string())
    }
}

/// Strips a markdown code fence (```` ```json ```` or bare ```` ``` ````) around an answer.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}

static ARRAY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"));
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"));

/// Fence-stripped answer, narrowed to its outermost `[...]` span when there is one.
pub fn extract_json_array(text: &str) -> &str {
    let stripped = extract_json(text);
    ARRAY_SPAN
        .find(stripped)
        .map(|m| m.as_str())
        .unwrap_or(stripped)
}

/// Fence-stripped answer, narrowed to its outermost `{...}` span when there is one.
pub fn extract_json_object(text: &str) -> &str {
    let stripped = extract_json(text);
    OBJECT_SPAN
        .find(stripped)
        .map(|m| m.as_str())
        .unwrap_or(stripped)
}
