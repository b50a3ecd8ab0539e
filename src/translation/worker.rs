/*!
 * Worker that owns one partition for the duration of a run.
 *
 * A worker drives its batches strictly in order: prompt, request, parse, apply.
 * Failed batches keep their source text and the worker moves on; cancellation
 * is observed at loop-top, before each retry, and during the inter-request delay.
 */

use futures::StreamExt;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

use crate::app_config::TranslatorConfig;
use crate::errors::ProviderError;
use crate::providers::openai::{ChatMessage, ChatRequest};
use crate::providers::Provider;

use super::cancellation::CancellationToken;
use super::partition::Partition;
use super::progress::{ProgressSender, FINISHED, STOPPED, STREAM_FINISHED};
use super::prompts::TranslationPromptBuilder;
use super::response::{parse_response, ValidationWarning};
use super::retry::{RetryDecision, RetryPolicy};

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Running,
    PausedOnCancel,
    Done,
}

/// Per-worker outcome returned to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub thread_id: usize,
    pub state: WorkerState,
    /// Units handled, whether translated or fallen back
    pub processed: usize,
    pub total: usize,
    /// Units that received a translation
    pub translated: usize,
    pub failed_batches: usize,
    pub warnings: Vec<ValidationWarning>,
    /// Whether the worker stopped on cancellation
    pub cancelled: bool,
    /// Set when the worker task itself died
    pub panicked: bool,
}

impl WorkerReport {
    fn new(thread_id: usize, total: usize) -> Self {
        Self {
            thread_id,
            state: WorkerState::Idle,
            processed: 0,
            total,
            translated: 0,
            failed_batches: 0,
            warnings: Vec::new(),
            cancelled: false,
            panicked: false,
        }
    }

    /// Report for a worker whose task was lost
    pub fn lost(thread_id: usize, total: usize) -> Self {
        Self {
            state: WorkerState::Done,
            panicked: true,
            ..Self::new(thread_id, total)
        }
    }
}

/// Result of one batch
#[derive(Debug)]
enum BatchOutcome {
    /// Response applied; `applied` units received text
    Translated { applied: usize },
    /// Retries exhausted or non-transient failure; units keep source text
    Failed(ProviderError),
    /// Cancellation observed before a retry
    Cancelled,
}

/// Translates one partition
pub struct Worker<P: Provider> {
    partition: Partition,
    provider: P,
    config: Arc<TranslatorConfig>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    progress: ProgressSender,
    report: WorkerReport,
}

impl<P: Provider> Worker<P> {
    /// Create a worker; it owns `partition` and `provider` exclusively
    pub fn new(
        partition: Partition,
        provider: P,
        config: Arc<TranslatorConfig>,
        cancel: CancellationToken,
        progress: ProgressSender,
    ) -> Self {
        let report = WorkerReport::new(partition.thread_id, partition.len());
        Self {
            retry: RetryPolicy::from_config(&config),
            partition,
            provider,
            config,
            cancel,
            progress,
            report,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.report.state
    }

    /// Process every batch, then hand back the partition and the report
    pub async fn run(mut self) -> (Partition, WorkerReport) {
        self.report.state = WorkerState::Running;
        let thread_id = self.partition.thread_id;

        match self.partition.line_range() {
            Some((first, last)) => {
                self.progress.status(0, format!("Ready. Range: {}-{}", first, last));
                info!("Worker {} ready: {} units, lines {}-{}", thread_id, self.partition.len(), first, last);
            }
            None => {
                self.progress.status(0, "Ready. Range: empty");
                debug!("Worker {} has nothing to do", thread_id);
            }
        }

        let batches = self.partition.batches(self.config.batch_size);
        let batch_count = batches.len();
        let delay = self.config.delay_duration();

        for (index, range) in batches.enumerate() {
            if self.cancel.is_cancelled() {
                self.stop();
                break;
            }

            let size = range.len();
            match self.process_batch(range).await {
                BatchOutcome::Translated { applied } => {
                    self.report.processed += size;
                    self.report.translated += applied;
                    self.progress.status(self.report.processed, "");
                }
                BatchOutcome::Failed(e) => {
                    self.report.processed += size;
                    self.report.failed_batches += 1;
                    error!("Worker {} batch {} failed: {}", thread_id, index + 1, e);
                    self.progress.status(self.report.processed, e.progress_message());
                }
                BatchOutcome::Cancelled => {
                    self.stop();
                    break;
                }
            }

            let is_last = index + 1 == batch_count;
            if !is_last && !delay.is_zero() && self.cancel.sleep(delay).await {
                self.stop();
                break;
            }
        }

        if !self.report.cancelled {
            self.progress.status(self.report.processed, FINISHED);
            info!(
                "Worker {} finished: {}/{} units translated, {} failed batches",
                thread_id, self.report.translated, self.report.total, self.report.failed_batches
            );
        }

        self.report.state = WorkerState::Done;
        (self.partition, self.report)
    }

    fn stop(&mut self) {
        self.report.state = WorkerState::PausedOnCancel;
        self.report.cancelled = true;
        self.progress.status(self.report.processed, STOPPED);
        info!("Worker {} stopped after {} units", self.partition.thread_id, self.report.processed);
    }

    async fn process_batch(&mut self, range: Range<usize>) -> BatchOutcome {
        let units = &self.partition.units[range.clone()];
        let expected: Vec<String> = units.iter().map(|u| u.id.clone()).collect();
        let messages = TranslationPromptBuilder::new(&self.config.system_prompt)
            .with_units(units)
            .build_messages();
        let expected_ids: Vec<&str> = expected.iter().map(String::as_str).collect();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = self
                .request(messages.clone())
                .await
                .and_then(|text| parse_response(&text, &expected_ids));

            match result {
                Ok(parsed) => {
                    let can_retry = attempts < self.retry.max_attempts;
                    if !parsed.is_complete() && self.config.require_full_coverage && can_retry {
                        warn!(
                            "Worker {}: {} IDs missing, retrying ({}/{})",
                            self.partition.thread_id,
                            parsed.missing.len(),
                            attempts,
                            self.retry.max_attempts
                        );
                        if self.cancel.sleep(self.retry.backoff).await {
                            return BatchOutcome::Cancelled;
                        }
                        continue;
                    }

                    let applied = parsed.apply_to(&mut self.partition.units[range]);
                    self.report.warnings.extend(parsed.warnings);
                    return BatchOutcome::Translated { applied };
                }
                Err(e) => match self.retry.evaluate(&e, attempts) {
                    RetryDecision::Retry(backoff) => {
                        warn!(
                            "Worker {}: attempt {}/{} failed: {}",
                            self.partition.thread_id, attempts, self.retry.max_attempts, e
                        );
                        if self.cancel.sleep(backoff).await {
                            return BatchOutcome::Cancelled;
                        }
                    }
                    RetryDecision::GiveUp => return BatchOutcome::Failed(e),
                },
            }
        }
    }

    /// One bounded API call in the configured mode
    async fn request(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let request = ChatRequest::from_config(&self.config, messages);
        let timeout = self.config.timeout();
        let call = async {
            if self.config.stream {
                self.stream_text(request).await
            } else {
                let response = self.provider.complete(request).await?;
                let text = response.text();
                self.progress
                    .status(self.report.processed, format!("Received: {} chars", text.chars().count()));
                Ok(text)
            }
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no complete response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Accumulate a streamed response while forwarding each increment
    async fn stream_text(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let mut stream = self.provider.complete_stream(request).await?;
        let mut text = String::new();
        while let Some(piece) = stream.next().await {
            let piece = piece?;
            self.progress.append(self.report.processed, piece.as_str());
            text.push_str(&piece);
        }
        self.progress.status(self.report.processed, STREAM_FINISHED);
        Ok(text)
    }
}
