//! Locator error types.

use std::fmt;
use std::io;

/// Locator error codes.
pub mod codes {
    pub const LOCATE_SPEC_INVALID: &str = "LOCATE_SPEC_INVALID";
    pub const LOCATE_NOT_FOUND: &str = "LOCATE_NOT_FOUND";
    pub const LOCATE_VERSION_NOT_FOUND: &str = "LOCATE_VERSION_NOT_FOUND";
    pub const LOCATE_REGISTRY_ERROR: &str = "LOCATE_REGISTRY_ERROR";
    pub const LOCATE_DOWNLOAD_FAILED: &str = "LOCATE_DOWNLOAD_FAILED";
    pub const LOCATE_TOOL_FAILED: &str = "LOCATE_TOOL_FAILED";
    pub const LOCATE_NO_ARCHIVE: &str = "LOCATE_NO_ARCHIVE";
    pub const LOCATE_TIMEOUT: &str = "LOCATE_TIMEOUT";
    pub const LOCATE_IO_ERROR: &str = "LOCATE_IO_ERROR";
}

/// A single locator strategy failed.
///
/// The race coordinator collects these; only when every strategy has failed
/// does the caller see them, wrapped in
/// [`FetchError::RaceExhausted`](crate::FetchError::RaceExhausted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateError {
    code: &'static str,
    strategy: String,
    message: String,
}

impl LocateError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            strategy: String::new(),
            message: message.into(),
        }
    }

    /// Attach the label of the strategy that produced this error.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Label of the failing strategy (empty if not yet attributed).
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCATE_SPEC_INVALID, msg)
    }

    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(codes::LOCATE_NOT_FOUND, format!("Package not found: {name}"))
    }

    #[must_use]
    pub fn version_not_found(name: &str, range: &str) -> Self {
        Self::new(
            codes::LOCATE_VERSION_NOT_FOUND,
            format!("No version of {name} satisfies range: {range}"),
        )
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCATE_REGISTRY_ERROR, msg)
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCATE_DOWNLOAD_FAILED, msg)
    }

    pub fn tool_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCATE_TOOL_FAILED, msg)
    }

    pub fn no_archive(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCATE_NO_ARCHIVE, msg)
    }

    #[must_use]
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            codes::LOCATE_TIMEOUT,
            format!("Attempt timed out after {}ms", after.as_millis()),
        )
    }
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strategy.is_empty() {
            write!(f, "{}: {}", self.code, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.strategy, self.code, self.message)
        }
    }
}

impl std::error::Error for LocateError {}

impl From<io::Error> for LocateError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::LOCATE_IO_ERROR, e.to_string())
    }
}

impl From<reqwest::Error> for LocateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::registry(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::registry(format!("Connection failed: {e}"))
        } else {
            Self::registry(e.to_string())
        }
    }
}

impl From<serde_json::Error> for LocateError {
    fn from(e: serde_json::Error) -> Self {
        Self::registry(format!("Invalid JSON: {e}"))
    }
}
