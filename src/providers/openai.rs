use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use log::{debug, error};
use reqwest::{Client, RequestBuilder, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::app_config::TranslatorConfig;
use crate::errors::ProviderError;
use super::{Provider, TextStream};

/// Client for OpenAI-compatible chat-completion APIs
#[derive(Debug, Clone)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication (may be empty for local servers)
    api_key: String,
    /// Base URL, e.g. "https://api.openai.com/v1"
    base_url: String,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Chat-completion request
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ChatRequest {
    /// The model to use
    pub model: String,

    /// The messages for the conversation
    pub messages: Vec<ChatMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Top k tokens to consider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new request for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Request with the run's model and sampling parameters
    pub fn from_config(config: &TranslatorConfig, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: config.model.clone(),
            messages,
            temperature: Some(config.temperature),
            top_p: Some(config.top_p),
            top_k: config.effective_top_k(),
            max_tokens: Some(config.max_tokens),
            stream: config.stream,
        }
    }

    /// Content of the last user message
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Assistant message inside a response choice; some servers send `null` content
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Individual choice in a response
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ResponseMessage,
}

/// Buffered chat-completion response
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Response carrying a single assistant message
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(text.into()),
                },
            }],
            usage: None,
        }
    }

    /// Assistant text of the first choice
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

impl OpenAI {
    /// Create a new client; fails when the TLS backend cannot be initialized
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                ProviderError::Transport(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Create a client from the run configuration
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, ProviderError> {
        Self::new(config.base_url.clone(), config.api_key.clone(), config.timeout())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .authorize(self.client.post(self.endpoint("chat/completions")))
            .json(request)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("API error ({}): {}", status, body);
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Decode a buffered body, surfacing `{"error": ...}` objects as API errors
fn parse_chat_body(body: &str) -> Result<ChatResponse, ProviderError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", e, preview(body))))?;
    if let Some(err) = value.get("error") {
        return Err(ProviderError::Api {
            status: err
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(500),
            body: err.to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Model ids from either `{"data": [...]}` or a bare array
pub fn parse_model_list(value: &Value) -> Vec<String> {
    let items = value
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| value.as_array());

    let mut models: Vec<String> = items
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    models.sort();
    models
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[async_trait]
impl Provider for OpenAI {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .authorize(self.client.get(self.endpoint("models")))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", e, preview(&body))))?;
        Ok(parse_model_list(&value))
    }

    async fn complete(&self, mut request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        request.stream = false;
        let response = self.send(&request).await?;
        let body = response.text().await?;
        let parsed = parse_chat_body(&body)?;
        if parsed.choices.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(parsed)
    }

    async fn complete_stream(&self, mut request: ChatRequest) -> Result<TextStream, ProviderError> {
        request.stream = true;
        let response = self.send(&request).await?;

        // Servers that ignore `stream` answer with a plain JSON body
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            debug!("Streaming requested but server replied with a buffered body");
            let body = response.text().await?;
            let text = parse_chat_body(&body)?.text();
            return Ok(Box::pin(stream::once(async move { Ok(text) })));
        }

        Ok(decode_sse(response.bytes_stream()))
    }
}

/// Text carried by one stream event, if any
fn event_text(data: &str) -> Result<Option<String>, ProviderError> {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring undecodable stream event ({}): {}", e, preview(data));
            return Ok(None);
        }
    };
    if let Some(err) = value.get("error") {
        return Err(ProviderError::Transport(format!("Stream reported error: {}", err)));
    }
    Ok(value["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
        .map(str::to_string))
}

fn stream_error<E: Into<ProviderError>>(error: EventStreamError<E>) -> ProviderError {
    match error {
        EventStreamError::Transport(e) => e.into(),
        EventStreamError::Utf8(e) => ProviderError::Transport(format!("Stream is not valid UTF-8: {}", e)),
        EventStreamError::Parser(e) => ProviderError::Transport(format!("Malformed stream event: {}", e)),
    }
}

/// Turn an SSE byte stream into a stream of assistant text increments.
///
/// The stream ends at `data: [DONE]`, when the connection closes, or right
/// after the first error.
pub fn decode_sse<S, B, E>(inner: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let texts = inner
        .eventsource()
        .take_while(|event| {
            let done = matches!(event, Ok(event) if event.data.trim() == "[DONE]");
            future::ready(!done)
        })
        .filter_map(|event| {
            future::ready(match event {
                Ok(event) => event_text(&event.data).transpose(),
                Err(e) => Some(Err(stream_error(e))),
            })
        })
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        });
    Box::pin(texts)
}
