/*!
 * Tests for provider implementations
 */

use anyhow::Result;
use futures::StreamExt;
use std::time::{Duration, Instant};
use linetrans::app_config::TranslatorConfig;
use linetrans::errors::ProviderError;
use linetrans::providers::mock::{MockBehavior, MockProvider};
use linetrans::providers::openai::{ChatMessage, ChatRequest};
use linetrans::providers::Provider;

fn batch_request(body: &str) -> ChatRequest {
    ChatRequest::from_config(
        &TranslatorConfig::default(),
        vec![ChatMessage::system("Translate."), ChatMessage::user(body)],
    )
}

/// Test that the mock lists its models
#[tokio::test]
async fn test_mockProvider_listModels_shouldReturnNames() -> Result<()> {
    let models = MockProvider::echo().list_models().await?;

    assert_eq!(models, vec!["mock-large".to_string(), "mock-small".to_string()]);
    Ok(())
}

/// Test that a failing mock fails model listing too
#[tokio::test]
async fn test_mockProvider_listModelsWhenFailing_shouldReturnError() {
    let provider = MockProvider::failing(ProviderError::Api { status: 401, body: "unauthorized".into() });

    let result = provider.list_models().await;

    assert!(matches!(result, Err(ProviderError::Api { status: 401, .. })));
}

/// Test that FailWhen only hits batches containing the needle
#[tokio::test]
async fn test_mockProvider_failWhen_shouldFailMatchingBatchOnly() -> Result<()> {
    let provider = MockProvider::new(MockBehavior::FailWhen {
        needle: "5:::".into(),
        error: ProviderError::Timeout("deadline".into()),
    });

    assert!(provider.complete(batch_request("5:::Five\n6:::Six")).await.is_err());
    let response = provider.complete(batch_request("7:::Seven")).await?;

    assert_eq!(response.text(), "7:::Seven");
    assert_eq!(provider.request_count(), 2);
    Ok(())
}

/// Test fixed, custom and empty answers
#[tokio::test]
async fn test_mockProvider_scriptedBodies_shouldReturnThem() -> Result<()> {
    let fixed = MockProvider::new(MockBehavior::Fixed("1:::Cố định".into()));
    assert_eq!(fixed.complete(batch_request("1:::Anything")).await?.text(), "1:::Cố định");

    let custom = MockProvider::new(MockBehavior::Custom(|user| user.to_uppercase()));
    assert_eq!(custom.complete(batch_request("1:::abc")).await?.text(), "1:::ABC");

    let empty = MockProvider::empty();
    assert_eq!(empty.complete(batch_request("1:::abc")).await?.text(), "");
    Ok(())
}

/// Test that requests are logged with the configured parameters
#[tokio::test]
async fn test_mockProvider_requests_shouldRecordModelAndMessages() -> Result<()> {
    let provider = MockProvider::echo();

    provider.complete(batch_request("1:::Hello")).await?;
    let requests = provider.requests();

    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, TranslatorConfig::default().model);
    assert_eq!(requests[0].user_content(), "1:::Hello");
    assert_eq!(requests[0].messages[0].role, "system");
    Ok(())
}

/// Test that streaming returns the same text as a buffered answer
#[tokio::test]
async fn test_mockProvider_completeStream_shouldConcatToBufferedText() -> Result<()> {
    let provider = MockProvider::prefixed("VI ").with_chunk_chars(4);
    let body = "1:::One\n2:::Two";

    let buffered = provider.complete(batch_request(body)).await?.text();
    let mut stream = provider.complete_stream(batch_request(body)).await?;
    let mut streamed = String::new();
    let mut pieces = 0;
    while let Some(piece) = stream.next().await {
        streamed.push_str(&piece?);
        pieces += 1;
    }

    assert_eq!(streamed, buffered);
    assert!(pieces > 1);
    Ok(())
}

/// Test that latency delays the answer
#[tokio::test]
async fn test_mockProvider_withLatency_shouldDelayAnswer() -> Result<()> {
    let provider = MockProvider::echo().with_latency(Duration::from_millis(50));
    let start = Instant::now();

    provider.complete(batch_request("1:::a")).await?;

    assert!(start.elapsed() >= Duration::from_millis(50));
    Ok(())
}

/// Test that top_k is only serialized when configured
#[test]
fn test_chatRequest_fromConfig_shouldSerializeSamplingParameters() -> Result<()> {
    let request = batch_request("1:::a");
    let json = serde_json::to_value(&request)?;

    assert_eq!(json["messages"][1]["content"], "1:::a");
    assert_eq!(json["max_tokens"], 4096);
    assert_eq!(json["stream"], true);
    assert!(json.get("top_k").is_none());

    let config = TranslatorConfig { top_k: 20, ..Default::default() };
    let json = serde_json::to_value(ChatRequest::from_config(&config, vec![]))?;
    assert_eq!(json["top_k"], 20);
    Ok(())
}
