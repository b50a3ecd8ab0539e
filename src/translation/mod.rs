/*!
 * Translation pipeline for `ID:::Text` files.
 *
 * This module contains the concurrent pipeline that turns parsed units into
 * translated units. It is split into several submodules:
 *
 * - `core`: Run orchestration and service definition
 * - `partition`: Partitioning across workers and batching inside a partition
 * - `prompts`: Request framing for a batch
 * - `response`: Response parsing and validation against the batch IDs
 * - `retry`: Retry policy for failed requests
 * - `worker`: Per-partition worker loop
 * - `progress`: Progress events, channel aggregation and sinks
 * - `cancellation`: Cooperative stop flag shared by the workers
 * - `assembler`: Merging of partitions and output writing
 */

// Re-export main types for easier usage
pub use self::cancellation::CancellationToken;
pub use self::core::{RunSummary, TranslationOutcome, TranslationService};
pub use self::partition::{partition, Partition};
pub use self::progress::{CollectingSink, LogSink, ProgressEvent, ProgressSink};
pub use self::prompts::TranslationPromptBuilder;
pub use self::response::{parse_response, ParsedResponse, ValidationWarning};
pub use self::retry::RetryPolicy;
pub use self::worker::{Worker, WorkerReport, WorkerState};

// Submodules
pub mod assembler;
pub mod cancellation;
pub mod core;
pub mod partition;
pub mod progress;
pub mod prompts;
pub mod response;
pub mod retry;
pub mod worker;
