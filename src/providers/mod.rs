/*!
 * Provider implementations for chat-completion services.
 *
 * This module contains the client abstraction used by the workers:
 * - OpenAI: any OpenAI-compatible chat-completion endpoint (buffered and streaming)
 * - Mock: scripted in-process provider for tests and dry runs
 */

use async_trait::async_trait;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;

use crate::errors::ProviderError;
use self::openai::{ChatRequest, ChatResponse};

/// Lazy sequence of text increments produced by a streaming completion.
///
/// The sequence is finite: it ends when the provider signals end-of-response or
/// the connection closes. An `Err` item ends the stream.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Common trait for chat-completion providers
///
/// Each worker owns its own provider instance, so implementations do not need
/// to coordinate between workers.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// List the model names the endpoint offers
    ///
    /// # Returns
    /// * `Result<Vec<String>, ProviderError>` - Sorted model names or an error
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Complete a request and wait for the whole body
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<ChatResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Complete a request and yield the assistant text as it is generated
    ///
    /// # Returns
    /// * `Result<TextStream, ProviderError>` - The increment stream, or an error raised
    ///   before the first byte (status, connection, timeout)
    async fn complete_stream(&self, request: ChatRequest) -> Result<TextStream, ProviderError>;
}

pub mod mock;
pub mod openai;
