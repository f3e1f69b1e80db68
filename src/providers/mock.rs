/*!
 * Mock provider for tests and dry runs.
 *
 * The mock never touches the network. A working mock returns the input
 * tagged with the target language (`"[Spanish] Hello"`). Other behaviors
 * script failures and latency so retry, ordering and concurrency rules can
 * be exercised deterministically:
 * - `MockProvider::working()` - always succeeds
 * - `MockProvider::failing(kind)` - always fails with `kind`
 * - `MockProvider::fail_times(n, kind)` - each distinct text fails `n` times, then succeeds
 * - `MockProvider::fail_on(needle, kind)` - fails for texts containing `needle`
 * - `MockProvider::random_delay(max_ms)` - succeeds after a random pause
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use crate::errors::{BackendError, BackendErrorKind, ProviderError};
use crate::providers::Provider;
use crate::translation::backend::TranslationBackend;

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub text: String,
    pub target_language: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a tagged translation
    Working,
    /// Always fails with the given kind
    Failing { kind: BackendErrorKind },
    /// Every distinct text fails `times` times before succeeding
    FailTimes { times: usize, kind: BackendErrorKind },
    /// Fails for any text containing `needle`, succeeds otherwise
    FailOn { needle: String, kind: BackendErrorKind },
    /// Returns an empty completion
    Empty,
    /// Succeeds after a fixed delay
    Slow { delay_ms: u64 },
    /// Succeeds after a random delay in `0..=max_ms`
    RandomDelay { max_ms: u64 },
}

#[derive(Debug, Default)]
struct MockStats {
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    attempts_by_text: Mutex<HashMap<String, usize>>,
}

/// Decrements the in-flight counter even when the request future is dropped
struct InFlight<'a>(&'a MockStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a MockStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock provider for testing translation behavior
///
/// Clones share their counters, so a test can hand one clone to the
/// pipeline and inspect the other afterwards.
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    stats: Arc<MockStats>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing(kind: BackendErrorKind) -> Self {
        Self::new(MockBehavior::Failing { kind })
    }

    pub fn fail_times(times: usize, kind: BackendErrorKind) -> Self {
        Self::new(MockBehavior::FailTimes { times, kind })
    }

    pub fn fail_on(needle: impl Into<String>, kind: BackendErrorKind) -> Self {
        Self::new(MockBehavior::FailOn {
            needle: needle.into(),
            kind,
        })
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn random_delay(max_ms: u64) -> Self {
        Self::new(MockBehavior::RandomDelay { max_ms })
    }

    /// Total requests received
    pub fn request_count(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests received for one exact text
    pub fn attempts_for(&self, text: &str) -> usize {
        self.stats.attempts_by_text.lock().get(text).copied().unwrap_or(0)
    }

    /// The deterministic translation the mock produces
    pub fn tagged(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    fn simulated_error(kind: BackendErrorKind, attempt: usize) -> ProviderError {
        let message = format!("Simulated {} failure (attempt #{})", kind, attempt);
        match kind {
            BackendErrorKind::RateLimited => ProviderError::RateLimitExceeded(message),
            BackendErrorKind::Unauthorized => ProviderError::AuthenticationError(message),
            BackendErrorKind::Timeout => ProviderError::Timeout(message),
            BackendErrorKind::InvalidResponse => ProviderError::ParseError(message),
            BackendErrorKind::Unknown => ProviderError::ApiError {
                status_code: 500,
                message,
            },
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: MockRequest) -> Result<MockResponse, ProviderError> {
        let _in_flight = InFlight::enter(&self.stats);
        self.stats.requests.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.stats.attempts_by_text.lock();
            let counter = attempts.entry(request.text.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let translated = || MockResponse {
            text: Self::tagged(&request.text, &request.target_language),
        };

        match &self.behavior {
            MockBehavior::Working => Ok(translated()),
            MockBehavior::Failing { kind } => Err(Self::simulated_error(*kind, attempt)),
            MockBehavior::FailTimes { times, kind } => {
                if attempt <= *times {
                    Err(Self::simulated_error(*kind, attempt))
                } else {
                    Ok(translated())
                }
            }
            MockBehavior::FailOn { needle, kind } => {
                if request.text.contains(needle.as_str()) {
                    Err(Self::simulated_error(*kind, attempt))
                } else {
                    Ok(translated())
                }
            }
            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(translated())
            }
            MockBehavior::RandomDelay { max_ms } => {
                let delay = rand::rng().random_range(0..=*max_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(translated())
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn extract_text(response: &MockResponse) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl TranslationBackend for MockProvider {
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let request = MockRequest {
            text: text.to_string(),
            target_language: target_language.to_string(),
        };
        let response = self.complete(request).await?;
        let translated = Self::extract_text(&response);
        if translated.trim().is_empty() {
            return Err(BackendError::invalid_response("Mock returned an empty completion"));
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
