use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::app_config::TranslatorConfig;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::translation::progress::{LogSink, ProgressEvent, ProgressSink};
use crate::translation::{CancellationToken, RunSummary, TranslationService};

// @module: Application controller exposing the host commands

// @const: Characters of streamed text shown next to a bar
const TAIL_CHARS: usize = 60;

/// Main application controller
///
/// Hosts call `fetch_models`, `start_translation` and `stop_translation`. Each
/// start installs a fresh cancellation token; stop cancels the current one.
pub struct Controller {
    // @field: Token of the current (or last) run
    cancel: Mutex<CancellationToken>,

    // @field: Where progress events go
    sink: Arc<dyn ProgressSink>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// Controller that reports progress through the log
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    /// Controller that renders one progress bar per worker
    pub fn with_progress_bars() -> Self {
        Self::with_sink(Arc::new(ProgressBars::new()))
    }

    // @method: Create a controller with the given progress sink
    pub fn with_sink(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            cancel: Mutex::new(CancellationToken::new()),
            sink,
        }
    }

    /// List the models offered by an OpenAI-compatible endpoint
    pub async fn fetch_models(&self, base_url: &str, api_key: &str) -> Result<Vec<String>> {
        let timeout = TranslatorConfig::default().timeout();
        let client = OpenAI::new(base_url, api_key, timeout)?;
        let models = client
            .list_models()
            .await
            .with_context(|| format!("Failed to fetch models from {}", base_url))?;
        info!("{} models available at {}", models.len(), base_url);
        Ok(models)
    }

    /// Translate `file_path` against the configured endpoint
    pub async fn start_translation(&self, config: TranslatorConfig, file_path: &Path) -> Result<RunSummary> {
        // workers share one connection pool
        let client = OpenAI::from_config(&config)?;
        self.start_translation_with(config, file_path, move |_| client.clone())
            .await
    }

    /// Translate `file_path`, building each worker's provider with `provider_factory`
    pub async fn start_translation_with<P, F>(
        &self,
        config: TranslatorConfig,
        file_path: &Path,
        provider_factory: F,
    ) -> Result<RunSummary>
    where
        P: Provider + 'static,
        F: Fn(usize) -> P,
    {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();

        let service = TranslationService::new(config)?;
        let summary = service
            .translate_file(file_path, provider_factory, token, Arc::clone(&self.sink))
            .await?;

        if summary.cancelled {
            warn!(
                "Translation stopped: {}/{} units translated",
                summary.translated_units, summary.total_units
            );
        }
        info!("Translated in {}", Self::format_duration(summary.elapsed));
        Ok(summary)
    }

    /// Ask the running translation to stop; safe to call at any time
    pub fn stop_translation(&self) {
        let token = self.cancel.lock().clone();
        if !token.is_cancelled() {
            info!("Stopping translation...");
        }
        token.cancel();
    }

    /// Token of the current run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// One bar and the streamed-text tail of a worker
struct WorkerLine {
    bar: ProgressBar,
    tail: String,
}

/// Progress sink rendering one `indicatif` bar per worker
pub struct ProgressBars {
    multi: MultiProgress,
    lines: Mutex<HashMap<usize, WorkerLine>>,
}

impl Default for ProgressBars {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBars {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            lines: Mutex::new(HashMap::new()),
        }
    }

    fn new_bar(&self, thread_id: usize, total: usize) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold} {spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{prefix} [{bar:30}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.set_prefix(format!("Worker {}", thread_id));
        bar
    }
}

/// Last `max` characters of `text`, on one line
pub fn tail_of(text: &str, max: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    let count = flat.chars().count();
    flat.chars().skip(count.saturating_sub(max)).collect()
}

impl ProgressSink for ProgressBars {
    fn on_event(&self, event: &ProgressEvent) {
        let mut lines = self.lines.lock();
        let line = lines.entry(event.thread_id).or_insert_with(|| WorkerLine {
            bar: self.new_bar(event.thread_id, event.total),
            tail: String::new(),
        });
        line.bar.set_position(event.current as u64);

        if event.append {
            line.tail.push_str(&event.message);
            if line.tail.len() > TAIL_CHARS * 8 {
                line.tail = tail_of(&line.tail, TAIL_CHARS);
            }
            line.bar.set_message(tail_of(&line.tail, TAIL_CHARS));
            return;
        }

        line.tail.clear();
        if event.is_noteworthy() {
            // printed above the bars so it stays visible
            let _ = self.multi.println(format!("[Worker {}] {}", event.thread_id, event.message));
        }
        if event.is_terminal() {
            line.bar.finish_with_message(event.message.clone());
        } else if !event.message.is_empty() {
            line.bar.set_message(event.message.clone());
        }
    }

    fn on_complete(&self) {
        for line in self.lines.lock().values() {
            if !line.bar.is_finished() {
                line.bar.abandon();
            }
        }
    }
}
