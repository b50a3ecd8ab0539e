/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use linetrans::app_config::{LogLevel, TranslatorConfig};
use linetrans::errors::ConfigError;
use crate::common;

/// Test that the default configuration matches the documented defaults
#[test]
fn test_default_config_shouldHaveDocumentedDefaults() {
    let config = TranslatorConfig::default();

    assert_eq!(config.threads, 1);
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.delay_duration(), Duration::from_millis(1300));
    assert_eq!(config.timeout(), Duration::from_secs(120));
    assert_eq!(config.max_attempts, 3);
    assert!(config.stream);
    assert!(config.api_key.is_empty());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test that saving and loading keeps every setting except the API key
#[test]
fn test_save_and_load_withApiKey_shouldNotPersistKey() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("config.json");
    let config = TranslatorConfig {
        api_key: "sk-test-123".to_string(),
        model: "gpt-4o-mini".to_string(),
        threads: 4,
        batch_size: 40,
        delay: 0.5,
        output_file: Some(PathBuf::from("out/tran.txt")),
        ..Default::default()
    };

    config.save(&config_path)?;
    let on_disk = std::fs::read_to_string(&config_path)?;
    let loaded = TranslatorConfig::load(&config_path)?;

    assert!(!on_disk.contains("sk-test-123"));
    assert!(loaded.api_key.is_empty());
    assert_eq!(loaded, TranslatorConfig { api_key: String::new(), ..config });
    Ok(())
}

/// Test that a partial config file is completed with defaults
#[test]
fn test_load_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        temp_dir.path(),
        "config.json",
        r#"{ "base_url": "http://localhost:8080/v1", "stream": false, "log_level": "debug" }"#,
    )?;

    let config = TranslatorConfig::load(&config_path)?;

    assert_eq!(config.base_url, "http://localhost:8080/v1");
    assert!(!config.stream);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.batch_size, 50);
    Ok(())
}

/// Test that malformed JSON is reported with the file path
#[test]
fn test_load_withMalformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(temp_dir.path(), "config.json", "{ not json")?;

    let err = TranslatorConfig::load(&config_path).unwrap_err();

    assert!(format!("{:#}", err).contains("config.json"));
    Ok(())
}

/// Test that out-of-range values are rejected with the field name
#[test]
fn test_validate_withInvalidValues_shouldNameField() {
    let cases: Vec<(TranslatorConfig, &str)> = vec![
        (TranslatorConfig { batch_size: 0, ..Default::default() }, "batch_size"),
        (TranslatorConfig { model: "  ".into(), ..Default::default() }, "model"),
        (TranslatorConfig { temperature: 3.5, ..Default::default() }, "temperature"),
        (TranslatorConfig { top_p: 1.5, ..Default::default() }, "top_p"),
        (TranslatorConfig { max_attempts: 0, ..Default::default() }, "max_attempts"),
        (TranslatorConfig { timeout_secs: 0, ..Default::default() }, "timeout_secs"),
        (TranslatorConfig { base_url: String::new(), ..Default::default() }, "base_url"),
    ];

    for (config, expected_field) in cases {
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected {} to be rejected, got {:?}", expected_field, other),
        }
    }
}

/// Test output path resolution with and without an explicit output file
#[test]
fn test_resolve_output_path_shouldPreferConfiguredFile() {
    let input = Path::new("/data/temp.txt");

    let config = TranslatorConfig::default();
    assert_eq!(config.resolve_output_path(input), Path::new("/data/tran.txt"));

    let config = TranslatorConfig {
        output_file: Some(PathBuf::from("/elsewhere/out.txt")),
        ..Default::default()
    };
    assert_eq!(config.resolve_output_path(input), Path::new("/elsewhere/out.txt"));
}

/// Test the log level mapping
#[test]
fn test_log_level_toLevelFilter_shouldMatchLogCrate() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
