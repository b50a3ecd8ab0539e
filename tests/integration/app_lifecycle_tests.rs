/*!
 * Integration tests for application lifecycle: controller commands against a
 * local OpenAI-compatible server
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use linetrans::app_config::TranslatorConfig;
use linetrans::app_controller::Controller;
use linetrans::providers::mock::MockProvider;
use linetrans::translation::progress::{CollectingSink, FINISHED};
use crate::common;

/// Answers every batch with its lines prefixed by `VI `, buffered or as SSE
struct TranslatingResponder {
    stream: bool,
}

impl Respond for TranslatingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let user = body["messages"][1]["content"].as_str().unwrap_or_default();
        let translated = user
            .lines()
            .map(|line| line.replacen(":::", ":::VI ", 1))
            .collect::<Vec<_>>()
            .join("\n");

        if self.stream {
            let chars: Vec<char> = translated.chars().collect();
            let pieces: Vec<String> = chars.chunks(6).map(|c| c.iter().collect()).collect();
            let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
            ResponseTemplate::new(200).set_body_raw(common::sse_body(&refs), "text/event-stream")
        } else {
            ResponseTemplate::new(200).set_body_json(common::chat_completion_body(&translated))
        }
    }
}

async fn translating_server(stream: bool) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(TranslatingResponder { stream })
        .mount(&server)
        .await;
    server
}

fn server_config(server: &MockServer, dir: &std::path::Path, stream: bool) -> TranslatorConfig {
    TranslatorConfig {
        base_url: server.uri(),
        api_key: "sk-lifecycle".to_string(),
        model: "test-model".to_string(),
        stream,
        ..common::fast_config(dir, 2, 3)
    }
}

/// Test a buffered run through the real HTTP client
#[tokio::test]
async fn test_start_translation_withBufferedServer_shouldWriteTranslatedFile() -> Result<()> {
    common::init_test_logging();
    let server = translating_server(false).await;
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "temp.txt", &common::sample_units(10))?;

    let controller = Controller::new();
    let summary = controller
        .start_translation(server_config(&server, temp_dir.path(), false), &input)
        .await?;

    let expected: String = (1..=10).map(|i| format!("{}:::VI Line {}\n", i, i)).collect();
    assert_eq!(fs::read_to_string(&summary.output_path)?, expected);
    assert_eq!(summary.translated_units, 10);

    // 5 units per worker in batches of 3
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 4);
    assert!(received
        .iter()
        .all(|r| r.headers.get("authorization").is_some_and(|v| v == "Bearer sk-lifecycle")));
    Ok(())
}

/// Test a streamed run through the real HTTP client
#[tokio::test]
async fn test_start_translation_withStreamingServer_shouldWriteTranslatedFile() -> Result<()> {
    let server = translating_server(true).await;
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_localization(temp_dir.path(), "temp.txt")?;
    let sink = CollectingSink::new();

    let controller = Controller::with_sink(Arc::new(sink.clone()));
    let summary = controller
        .start_translation(server_config(&server, temp_dir.path(), true), &input)
        .await?;

    let output = fs::read_to_string(&summary.output_path)?;
    assert_eq!(
        output,
        "0:::Header v1.2\n\
         1:::VI Welcome, {PlayerName}!\n\
         2:::VI Press {Key} to continue.\\n\n\
         Then wait.\n\
         3:::VI Solaris-3 awaits.\n"
    );
    assert!(sink.events().iter().any(|e| e.append));
    for thread_id in 0..2 {
        let last = sink.events_for(thread_id).pop();
        assert_eq!(last.map(|e| e.message), Some(FINISHED.to_string()));
    }
    Ok(())
}

/// Test that stop_translation cancels the run in flight and a later start runs fresh
#[tokio::test]
async fn test_stop_translation_duringRun_shouldCancelAndAllowRestart() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "temp.txt", &common::sample_units(30))?;
    let config = common::fast_config(temp_dir.path(), 1, 1);
    let slow = MockProvider::prefixed("T ").with_latency(Duration::from_millis(40));

    let controller = Controller::with_sink(Arc::new(CollectingSink::new()));
    let run = controller.start_translation_with(config.clone(), &input, |_| slow.clone());
    let stop = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.stop_translation();
    };
    let (summary, ()) = tokio::join!(run, stop);
    let summary = summary?;

    assert!(summary.cancelled);
    assert!(summary.translated_units < 30);
    assert!(slow.request_count() < 30);

    let summary = controller
        .start_translation_with(config, &input, |_| MockProvider::prefixed("T "))
        .await?;
    assert!(!summary.cancelled);
    assert_eq!(summary.translated_units, 30);
    Ok(())
}

/// Test model listing through the controller
#[tokio::test]
async fn test_fetch_models_withServer_shouldListIds() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "open-mistral-nemo" }, { "id": "mistral-large-latest" }]
        })))
        .mount(&server)
        .await;

    let models = Controller::new().fetch_models(&server.uri(), "").await?;

    assert_eq!(models, vec!["mistral-large-latest".to_string(), "open-mistral-nemo".to_string()]);
    Ok(())
}

/// Test that an unreachable endpoint is reported with its URL
#[test]
fn test_fetch_models_withUnreachableEndpoint_shouldNameUrl() {
    let result = tokio_test::block_on(Controller::new().fetch_models("http://127.0.0.1:9", ""));

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("http://127.0.0.1:9"));
}

/// Test that an invalid configuration is rejected before anything is read
#[tokio::test]
async fn test_start_translation_withInvalidConfig_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "temp.txt", "1:::A\n")?;
    let config = TranslatorConfig {
        threads: 0,
        ..common::fast_config(temp_dir.path(), 1, 1)
    };

    let result = Controller::new()
        .start_translation_with(config, &input, |_| MockProvider::echo())
        .await;

    assert!(format!("{:#}", result.unwrap_err()).contains("threads"));
    Ok(())
}

/// Test that a config written by one session is read back by the next without the key
#[test]
fn test_config_file_acrossSessions_shouldKeepSettingsButNotKey() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("config.json");
    let first = TranslatorConfig {
        api_key: "sk-session".to_string(),
        last_file: "chapter1.txt".to_string(),
        threads: 3,
        ..Default::default()
    };
    first.save(&config_path)?;

    let second = TranslatorConfig::load(&config_path)?;

    assert_eq!(second.last_file, "chapter1.txt");
    assert_eq!(second.threads, 3);
    assert!(second.api_key.is_empty());
    Ok(())
}
