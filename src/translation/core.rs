/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, which runs one
 * translation: parse, partition, one worker task per partition, join, assemble.
 */

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::app_config::TranslatorConfig;
use crate::file_utils::FileManager;
use crate::providers::Provider;
use crate::unit_processor::UnitCollection;

use super::assembler::{merge_partitions, write_output};
use super::cancellation::CancellationToken;
use super::partition::partition;
use super::progress::{spawn_aggregator, ProgressSender, ProgressSink};
use super::response::ValidationWarning;
use super::worker::{Worker, WorkerReport};

/// Outcome of a run, returned to the host
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// File that was written
    pub output_path: PathBuf,
    /// Units in the input (header excluded)
    pub total_units: usize,
    /// Units that received a translation
    pub translated_units: usize,
    /// Batches that fell back to source text
    pub failed_batches: usize,
    /// Validation warnings of all workers
    pub warnings: Vec<ValidationWarning>,
    /// Whether the run was stopped early
    pub cancelled: bool,
    /// Per-worker outcomes, by thread id
    pub workers: Vec<WorkerReport>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// One-paragraph summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Translation Summary:\n\
             Output: {}\n\
             Translated units: {}/{}\n\
             Failed batches: {}\n\
             Validation warnings: {}\n\
             Cancelled: {}\n\
             Elapsed time: {:.2}s",
            self.output_path.display(),
            self.translated_units,
            self.total_units,
            self.failed_batches,
            self.warnings.len(),
            if self.cancelled { "yes" } else { "no" },
            self.elapsed.as_secs_f64()
        )
    }
}

/// Translated collection plus per-worker reports, before anything is written
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub collection: UnitCollection,
    pub workers: Vec<WorkerReport>,
}

impl TranslationOutcome {
    pub fn cancelled(&self) -> bool {
        self.workers.iter().any(|w| w.cancelled)
    }

    pub fn failed_batches(&self) -> usize {
        self.workers.iter().map(|w| w.failed_batches).sum()
    }

    pub fn warnings(&self) -> Vec<ValidationWarning> {
        self.workers.iter().flat_map(|w| w.warnings.iter().cloned()).collect()
    }
}

/// Translation service for one immutable configuration snapshot
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Configuration shared read-only with every worker
    pub config: Arc<TranslatorConfig>,
}

impl TranslationService {
    /// Create a new translation service; invalid configuration is rejected here
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate().context("Invalid translator configuration")?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Translate every unit of `collection` with one worker per partition.
    ///
    /// `provider_factory` is called once per worker with its thread id so each
    /// worker owns its own client. A worker task that dies leaves its units with
    /// their source text.
    pub async fn translate_collection<P, F>(
        &self,
        collection: &UnitCollection,
        provider_factory: F,
        cancel: CancellationToken,
        sink: Arc<dyn ProgressSink>,
    ) -> TranslationOutcome
    where
        P: Provider + 'static,
        F: Fn(usize) -> P,
    {
        let partitions = partition(&collection.units, self.config.threads);
        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = spawn_aggregator(rx, sink);

        let mut handles = Vec::with_capacity(partitions.len());
        for part in partitions {
            let thread_id = part.thread_id;
            let total = part.len();
            let worker = Worker::new(
                part,
                provider_factory(thread_id),
                Arc::clone(&self.config),
                cancel.clone(),
                ProgressSender::new(thread_id, total, tx.clone()),
            );
            handles.push((thread_id, total, tokio::spawn(worker.run())));
        }
        // the aggregator ends once the last worker drops its sender
        drop(tx);

        let mut returned = Vec::with_capacity(handles.len());
        let mut workers = Vec::with_capacity(handles.len());
        for (thread_id, total, handle) in handles {
            match handle.await {
                Ok((part, report)) => {
                    returned.push(part);
                    workers.push(report);
                }
                Err(e) => {
                    error!("Worker {} died, its units keep their source text: {}", thread_id, e);
                    workers.push(WorkerReport::lost(thread_id, total));
                }
            }
        }

        if let Err(e) = aggregator.await {
            warn!("Progress aggregator ended abnormally: {}", e);
        }

        TranslationOutcome {
            collection: merge_partitions(collection, returned),
            workers,
        }
    }

    /// Read `input_file`, translate it and write the result.
    ///
    /// Fatal errors (unreadable file, parse error) abort before any worker starts.
    /// A cancelled run still writes a complete file: untranslated units keep
    /// their source text.
    pub async fn translate_file<P, F>(
        &self,
        input_file: &Path,
        provider_factory: F,
        cancel: CancellationToken,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<RunSummary>
    where
        P: Provider + 'static,
        F: Fn(usize) -> P,
    {
        let start = Instant::now();
        let content = FileManager::read_to_string(input_file)?;
        let collection = UnitCollection::parse_str(&content, self.config.preserve_header)
            .with_context(|| format!("Failed to parse input file: {}", input_file.display()))?;
        let output_path = self.config.resolve_output_path(input_file);

        info!(
            "Translating {} units from {} with {} worker(s), batch size {} ({})",
            collection.len(),
            input_file.display(),
            self.config.threads,
            self.config.batch_size,
            self.config.model
        );

        let outcome = self
            .translate_collection(&collection, provider_factory, cancel, sink)
            .await;

        write_output(&output_path, &outcome.collection)?;

        let summary = RunSummary {
            output_path,
            total_units: outcome.collection.len(),
            translated_units: outcome.collection.translated_count(),
            failed_batches: outcome.failed_batches(),
            warnings: outcome.warnings(),
            cancelled: outcome.cancelled(),
            workers: outcome.workers,
            elapsed: start.elapsed(),
        };
        info!("Success: {}", summary.output_path.display());
        Ok(summary)
    }
}
