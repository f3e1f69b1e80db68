/*!
 * Error types for the srtlingo pipeline.
 *
 * Library errors are defined with thiserror. Raw HTTP failures from the
 * provider clients (`ProviderError`) are classified into a `BackendError`
 * so the orchestrator can decide whether to retry without knowing which
 * provider produced them.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Map a transport error from reqwest onto the closest variant
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Build an error from a non-success HTTP status
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Category of a failed translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    RateLimited,
    Unauthorized,
    Timeout,
    InvalidResponse,
    Unknown,
}

impl BackendErrorKind {
    /// Default retry classification for the kind
    pub fn is_retryable_by_default(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RateLimited => "rate limited",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid response",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Failure of a single translation request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl BackendError {
    /// Create an error with the default retry classification for `kind`
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            retryable: kind.is_retryable_by_default(),
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimited, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unauthorized, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unknown, message)
    }

    /// Override the retry classification
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl From<ProviderError> for BackendError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error {
            ProviderError::RateLimitExceeded(_) => Self::rate_limited(message),
            ProviderError::AuthenticationError(_) => Self::unauthorized(message),
            ProviderError::Timeout(_) => Self::timeout(message),
            ProviderError::ParseError(_) => Self::invalid_response(message),
            ProviderError::ApiError { status_code, .. } => match status_code {
                408 | 504 => Self::timeout(message),
                400..=499 => Self::invalid_response(message),
                // Upstream outages clear up on their own
                _ => Self::unknown(message).with_retryable(true),
            },
            ProviderError::ConnectionError(_) | ProviderError::RequestFailed(_) => {
                Self::unknown(message).with_retryable(true)
            }
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubtitleError {
    /// The input is not a well-formed subtitle document
    #[error("Parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number in the input
        line: usize,
        reason: String,
    },

    /// The number of replacement texts does not match the entry count
    #[error("Expected {expected} translated texts, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl SubtitleError {
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors that end the translation of a file or a batch run
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// An entry could not be translated
    #[error("Entry {entry} failed after {attempts} attempt(s): {source}")]
    Backend {
        /// 1-based position of the entry in the document
        entry: usize,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// Another run holds the lock for this scope
    #[error("Another run is in progress (lock {lock_path:?} held by pid {owner_pid} since {since})")]
    AlreadyRunning {
        lock_path: PathBuf,
        owner_pid: u32,
        since: String,
    },

    /// Filesystem failure reading input or writing output
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before it finished
    #[error("Translation cancelled")]
    Cancelled,
}

impl TranslationError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
