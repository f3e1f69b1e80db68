/*!
 * # srtlingo - idempotent subtitle translation with AI
 *
 * A Rust library for translating SRT subtitle files with AI providers,
 * safely re-runnable over the same files.
 *
 * ## Features
 *
 * - Parse and serialize SRT with timing and entry order preserved
 * - Translate through a pluggable backend:
 *   - Ollama (local LLM)
 *   - OpenAI API and OpenAI-compatible servers (LM Studio, DeepSeek)
 *   - Anthropic API
 *   - An offline mock provider
 * - Bounded concurrency per file with retry and exponential backoff
 * - Content-fingerprinted output names, so unchanged inputs are skipped
 * - A lock file keeping two runs out of the same working scope
 * - Cooperative cancellation and progress reporting
 *
 * ## Architecture
 *
 * - `subtitle_processor`: SRT document model
 * - `translation`: backend trait, provider-backed service, cache, retry and batching
 * - `ledger`: fingerprint naming and the run lock
 * - `orchestrator`: per-file pipeline and directory runs
 * - `progress`: observer interface for progress ticks
 * - `providers`: HTTP clients for the supported providers
 * - `app_config`, `app_controller`: configuration and application wiring
 * - `file_utils`, `language_utils`, `errors`: shared helpers and error types
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod ledger;
pub mod orchestrator;
pub mod progress;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{BackendError, BackendErrorKind, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use orchestrator::{BatchSummary, FileOutcome, JobDescriptor, Orchestrator, OrchestratorSettings};
pub use progress::{FileState, NoopProgress, ProgressObserver};
pub use subtitle_processor::{SubtitleDocument, SubtitleEntry};
pub use translation::{TranslationBackend, TranslationService};
