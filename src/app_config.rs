use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles the translator configuration including loading,
/// validating and saving configuration settings.
/// The configuration is an immutable snapshot per run: the controller clones it
/// into an `Arc` at start and nothing mutates it afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Base URL of the OpenAI-compatible API (e.g. "https://api.mistral.ai/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key, never written back to the config file
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt sent verbatim with every batch
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens the model may generate per batch
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Top-k sampling, only sent when positive
    #[serde(default = "default_top_k")]
    pub top_k: i32,

    /// Stream tokens as they are generated
    #[serde(default = "default_true")]
    pub stream: bool,

    /// Number of workers (one partition each)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Units per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds each worker waits between requests, also used as retry backoff
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Last input file translated
    #[serde(default = "default_last_file")]
    pub last_file: String,

    /// Destination file; defaults to `tran.txt` next to the input
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per batch before it falls back to source text
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry a batch whose response is missing IDs
    #[serde(default)]
    pub require_full_coverage: bool,

    /// Carry a leading `0:::` line through untranslated
    #[serde(default = "default_true")]
    pub preserve_header: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map onto the `log` crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_model() -> String {
    "mistral-large-latest".to_string()
}

pub fn default_system_prompt() -> String {
    "# ROLE: Master of Game Localization (English to Vietnamese)\n\
     # CONTEXT: Wuthering Waves (Kuro Games) - Sci-fi, Post-apocalyptic, Solaris-3.\n\n\
     ## 1. MANDATORY TECHNICAL PROTOCOL (STRICT):\n\
     - FORMAT: Always '{ID}:::{TranslatedText}'. One ID per line. NO blank lines between IDs.\n\
     - INTEGRITY: Preserve {tags}. No new braces.\n\
     - LITERALS: Keep '\\n' as literal.\n\
     - NO CHAT: Output ONLY translated content.\n\n\
     ## 5. FINAL EXECUTION:\n\
     Translate EVERY line. Format: ID:::Text"
        .to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_top_p() -> f64 {
    1.0
}

fn default_top_k() -> i32 {
    -1 // ignored
}

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    1
}

fn default_batch_size() -> usize {
    50
}

fn default_delay() -> f64 {
    1.3
}

fn default_last_file() -> String {
    "temp.txt".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

/// Default implementation for TranslatorConfig
impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            stream: true,
            threads: default_threads(),
            batch_size: default_batch_size(),
            delay: default_delay(),
            last_file: default_last_file(),
            output_file: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            require_full_coverage: false,
            preserve_header: true,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslatorConfig {
    /// Load a configuration file; keys missing from the file take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: TranslatorConfig = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON (the API key is skipped)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        if let Err(e) = Url::parse(self.base_url.trim()) {
            return Err(invalid("base_url", format!("'{}' is not a valid URL: {}", self.base_url, e)));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if self.threads == 0 {
            return Err(invalid("threads", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(invalid("delay", format!("{} is not a non-negative number of seconds", self.delay)));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature", format!("{} is outside 0.0..=2.0", self.temperature)));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(invalid("top_p", format!("{} is outside 0.0..=1.0", self.top_p)));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Inter-request delay
    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }

    /// Per-request wall-clock limit
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Top-k value to send, if any
    pub fn effective_top_k(&self) -> Option<u32> {
        if self.top_k > 0 { Some(self.top_k as u32) } else { None }
    }

    /// Resolve where the output of translating `input_file` goes
    pub fn resolve_output_path(&self, input_file: &Path) -> PathBuf {
        match &self.output_file {
            Some(path) => path.clone(),
            None => crate::file_utils::FileManager::generate_output_path(input_file),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
