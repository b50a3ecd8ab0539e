/*!
 * Mock provider implementations for testing.
 *
 * This module provides a scripted provider that answers chat requests in-process:
 * - `MockProvider::echo()` - Returns the batch lines unchanged
 * - `MockProvider::prefixed(p)` - Prefixes every text with `p`
 * - `MockProvider::dropping(ids)` - Leaves the given IDs out of the answer
 * - `MockProvider::failing(err)` - Always fails with the given error
 * - `MockProvider::empty()` - Returns an empty assistant message
 */

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::openai::{ChatRequest, ChatResponse};
use crate::providers::{Provider, TextStream};
use crate::unit_processor::{split_unit_line, DELIMITER};

/// Behavior mode for the mock provider
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answers with the user message verbatim
    Echo,
    /// Answers `ID:::{prefix}{text}` for every line
    Prefix(String),
    /// Echo, minus the listed IDs
    DropIds(HashSet<String>),
    /// Always fails
    Fail(ProviderError),
    /// Fails the first `failures` calls, then echoes
    FailFirst { failures: usize, error: ProviderError },
    /// Fails whenever the batch contains `needle`, echoes otherwise
    FailWhen { needle: String, error: ProviderError },
    /// Returns an empty message
    Empty,
    /// Returns a fixed body whatever the request
    Fixed(String),
    /// Custom answer generator over the user message
    Custom(fn(&str) -> String),
}

/// Mock provider for testing translation behavior
///
/// Clones share their request log and counter, so a factory handing a clone to
/// every worker still lets the test inspect all traffic.
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Delay before answering
    latency: Duration,
    /// Characters per streamed increment
    chunk_chars: usize,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    /// Models reported by `list_models`
    models: Vec<String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            chunk_chars: 7,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            models: vec!["mock-large".to_string(), "mock-small".to_string()],
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self::new(MockBehavior::Prefix(prefix.into()))
    }

    pub fn dropping<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockBehavior::DropIds(ids.into_iter().map(Into::into).collect()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Wait `latency` before every answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Size of streamed increments
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Number of completion calls made so far (across clones)
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far (across clones)
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    fn answer(&self, request: &ChatRequest, call: usize) -> Result<String, ProviderError> {
        let user = request.user_content();
        match &self.behavior {
            MockBehavior::Echo => Ok(user.to_string()),
            MockBehavior::Prefix(prefix) => Ok(map_lines(user, |id, text| {
                Some(format!("{}{}{}{}", id, DELIMITER, prefix, text))
            })),
            MockBehavior::DropIds(ids) => Ok(map_lines(user, |id, text| {
                (!ids.contains(id)).then(|| format!("{}{}{}", id, DELIMITER, text))
            })),
            MockBehavior::Fail(error) => Err(error.clone()),
            MockBehavior::FailFirst { failures, error } => {
                if call < *failures {
                    Err(error.clone())
                } else {
                    Ok(user.to_string())
                }
            }
            MockBehavior::FailWhen { needle, error } => {
                if user.contains(needle.as_str()) {
                    Err(error.clone())
                } else {
                    Ok(user.to_string())
                }
            }
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Fixed(body) => Ok(body.clone()),
            MockBehavior::Custom(generator) => Ok(generator(user)),
        }
    }

    async fn respond(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer(&request, call);
        self.requests.lock().push(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        answer
    }
}

/// Rewrite each `ID:::Text` line, keeping continuation lines with the unit
/// they belong to
fn map_lines<F>(body: &str, mut f: F) -> String
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut out: Vec<String> = Vec::new();
    let mut keep_continuation = false;
    for line in body.lines() {
        match split_unit_line(line) {
            Some((id, text)) => match f(id, text) {
                Some(mapped) => {
                    out.push(mapped);
                    keep_continuation = true;
                }
                None => keep_continuation = false,
            },
            None if keep_continuation => out.push(line.to_string()),
            None => {}
        }
    }
    out.join("\n")
}

#[async_trait]
impl Provider for MockProvider {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        match &self.behavior {
            MockBehavior::Fail(error) => Err(error.clone()),
            _ => Ok(self.models.clone()),
        }
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let text = self.respond(request).await?;
        Ok(ChatResponse::from_text(text))
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<TextStream, ProviderError> {
        let text = self.respond(request).await?;
        let chars: Vec<char> = text.chars().collect();
        let pieces: Vec<Result<String, ProviderError>> = chars
            .chunks(self.chunk_chars)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        Ok(Box::pin(stream::iter(pieces)))
    }
}
