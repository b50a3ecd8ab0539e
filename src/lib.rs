/*!
 * # linetrans - batch translator for line-delimited localization files
 *
 * A Rust library for translating `ID:::Text` files through an OpenAI-compatible
 * chat-completion API.
 *
 * ## Features
 *
 * - Parsing of `ID:::Text` files with literal `\n` continuations and an optional header
 * - Partitioning across concurrent workers, fixed-size batches per worker
 * - Buffered or streamed (server-sent events) responses
 * - Strict response validation against the batch's IDs, with source-text fallback
 * - Retries for transient failures, fixed-interval rate limiting per worker
 * - Cooperative cancellation and live per-worker progress events
 * - Atomic output writing
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `unit_processor`: Input parsing into translation units
 * - `translation`: The concurrent translation pipeline:
 *   - `translation::core`: Run orchestration
 *   - `translation::partition`: Partitioning and batching
 *   - `translation::prompts`: Request framing
 *   - `translation::response`: Response parsing and validation
 *   - `translation::worker`: Per-partition worker loop
 *   - `translation::progress`: Progress events and sinks
 *   - `translation::cancellation`: Stop flag shared by the workers
 *   - `translation::assembler`: Output assembly
 * - `file_utils`: File system operations
 * - `app_controller`: Host commands (`fetch_models`, `start_translation`, `stop_translation`)
 * - `providers`: Chat-completion clients:
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::mock`: Scripted provider for tests
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod translation;
pub mod unit_processor;

// Re-export main types for easier usage
pub use app_config::TranslatorConfig;
pub use app_controller::Controller;
pub use errors::{AppError, ConfigError, ProviderError, UnitParseError};
pub use translation::{CancellationToken, ProgressEvent, RunSummary, TranslationService};
pub use unit_processor::{TranslationUnit, UnitCollection};
