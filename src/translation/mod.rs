/*!
 * Translation layer between documents and providers.
 *
 * - `backend`: the `TranslationBackend` trait every provider is driven through
 * - `core`: `TranslationService`, the provider-backed backend with prompts and caching
 * - `cache`: in-memory translation cache
 * - `rate_limit`: requests-per-minute limiter shared by all requests of a run
 * - `retry`: retry policy with exponential backoff and cancellation
 * - `batch`: bounded-concurrency translation of a document's entries
 */

// Re-export main types for easier usage
pub use self::backend::TranslationBackend;
pub use self::batch::BatchTranslator;
pub use self::core::TranslationService;
pub use self::rate_limit::RateLimiter;
pub use self::retry::{RetryFailure, RetryPolicy};

// Submodules
pub mod backend;
pub mod batch;
pub mod cache;
pub mod core;
pub mod rate_limit;
pub mod retry;
