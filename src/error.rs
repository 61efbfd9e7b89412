//! Error types for the signup runner.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::SourceMissing`] |
//! | Provisioning | [`Error::Provisioning`] |
//! | Navigation | [`Error::Navigation`] |
//! | Step | [`Error::ElementNotFound`], [`Error::InteractionRejected`] |
//! | Identifier | [`Error::MalformedIdentifier`] |
//! | Persistence | [`Error::LedgerUnwritable`] |
//! | Driver | [`Error::Driver`], [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Http`] |
//!
//! Step-level and classifier-level conditions are recovered into an
//! [`Outcome`](crate::flow::Outcome) at the attempt boundary; only
//! [`Error::SourceMissing`] and [`Error::LedgerUnwritable`] are fatal
//! to the process.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for diagnosis; the attempt
/// boundary preserves the rendered message in the recorded outcome.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the runner configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Identifier source file missing or unreadable.
    ///
    /// Fatal to the process: without a phone list there is nothing to run.
    #[error("Phone list not found at: {path}")]
    SourceMissing {
        /// Path where the phone list was expected.
        path: PathBuf,
    },

    // ========================================================================
    // Provisioning Errors
    // ========================================================================
    /// Session provisioning failed.
    ///
    /// The upstream allocator was unreachable, exhausted, or returned no
    /// connectable endpoint within the bounded wait. Fatal to the attempt,
    /// not to the process.
    #[error("Provisioning failed: {message}")]
    Provisioning {
        /// Description of the provisioning failure.
        message: String,
    },

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// Initial page load failed.
    ///
    /// Fatal to the attempt. A fresh attempt with a new session is the
    /// retry unit, never a sub-step retry.
    #[error("Navigation failed: {url}: {message}")]
    Navigation {
        /// URL that failed to load.
        url: String,
        /// Description of the navigation failure.
        message: String,
    },

    // ========================================================================
    // Step Errors
    // ========================================================================
    /// No candidate locator matched within the step timeout.
    ///
    /// Raised only after every alternative strategy for the step has been
    /// exhausted.
    #[error("Element not found for step '{step}' after {candidates} candidates")]
    ElementNotFound {
        /// The logical step that failed.
        step: String,
        /// Number of candidate locators tried.
        candidates: usize,
    },

    /// Element located but the interaction was refused.
    ///
    /// Distinct from [`Error::ElementNotFound`]: the target exists but is
    /// disabled or rejected the action.
    #[error("Interaction rejected at step '{step}': {message}")]
    InteractionRejected {
        /// The logical step that failed.
        step: String,
        /// Description of the refusal.
        message: String,
    },

    // ========================================================================
    // Identifier Errors
    // ========================================================================
    /// A raw phone-list line could not be parsed.
    ///
    /// Logged and skipped during load; never fatal.
    #[error("Malformed identifier '{raw}': {message}")]
    MalformedIdentifier {
        /// The offending raw line.
        raw: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The outcome ledger could not be written.
    ///
    /// Fatal to the process: continuing would burn identifiers without
    /// recording their outcomes.
    #[error("Outcome ledger unwritable at {path}: {message}")]
    LedgerUnwritable {
        /// Path of the ledger file.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // Driver Errors
    // ========================================================================
    /// The remote browser driver returned a protocol-level failure.
    #[error("Driver error: {message}")]
    Driver {
        /// Description of the driver failure.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a source-missing error.
    #[inline]
    pub fn source_missing(path: impl Into<PathBuf>) -> Self {
        Self::SourceMissing { path: path.into() }
    }

    /// Creates a provisioning error.
    #[inline]
    pub fn provisioning(message: impl Into<String>) -> Self {
        Self::Provisioning {
            message: message.into(),
        }
    }

    /// Creates a navigation error.
    #[inline]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an element-not-found error.
    #[inline]
    pub fn element_not_found(step: impl Into<String>, candidates: usize) -> Self {
        Self::ElementNotFound {
            step: step.into(),
            candidates,
        }
    }

    /// Creates an interaction-rejected error.
    #[inline]
    pub fn interaction_rejected(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InteractionRejected {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed-identifier error.
    #[inline]
    pub fn malformed_identifier(raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Creates a ledger-unwritable error.
    #[inline]
    pub fn ledger_unwritable(path: impl Into<PathBuf>, err: IoError) -> Self {
        Self::LedgerUnwritable {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Creates a driver error.
    #[inline]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error ends the current attempt but lets the
    /// process proceed to the next identifier.
    #[inline]
    #[must_use]
    pub fn is_attempt_fatal(&self) -> bool {
        matches!(
            self,
            Self::Provisioning { .. }
                | Self::Navigation { .. }
                | Self::ElementNotFound { .. }
                | Self::InteractionRejected { .. }
                | Self::Driver { .. }
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` if this error must stop the process.
    #[inline]
    #[must_use]
    pub fn is_process_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceMissing { .. } | Self::LedgerUnwritable { .. }
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a step-level element error.
    #[inline]
    #[must_use]
    pub fn is_step_error(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::InteractionRejected { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
