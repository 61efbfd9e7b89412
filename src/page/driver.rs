//! The remote browser driver boundary.
//!
//! The core never touches a browser engine directly. Everything it needs
//! from the page goes through [`PageDriver`], an object-safe capability set:
//! navigate, locate, interact, read text, observe failed responses, and
//! capture screenshots. Any engine that can do those things can drive the
//! signup flow.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

use super::locator::Locator;

// ============================================================================
// ElementRef
// ============================================================================

/// Opaque handle to a located element.
///
/// Valid only for the driver that produced it; handles are never shared
/// across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    /// Wraps a driver-issued element id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw driver-issued id.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ResponseRecord
// ============================================================================

/// A network response observed by the driver, reduced to what the
/// classifier consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Request URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
}

// ============================================================================
// PageDriver Trait
// ============================================================================

/// Capability set the core requires from a browser engine.
///
/// Implementations must be safe to drop without explicit shutdown; session
/// teardown is the provisioner's job and must never double-free the
/// underlying browser.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates to a URL and waits for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current page URL.
    async fn page_url(&self) -> Result<String>;

    /// Locates the first element matching the locator, or `None`.
    ///
    /// A `None` here is not an error; candidate chains expect misses.
    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>>;

    /// Whether a located element is currently visible.
    async fn is_visible(&self, element: &ElementRef) -> Result<bool>;

    /// Whether a located element is enabled (not disabled / readonly).
    async fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    /// Clicks an element.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Replaces an element's value.
    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// Types into an element keystroke by keystroke.
    async fn type_text(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// Selects an option of a native `<select>` by value.
    async fn select_value(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// Full visible text of the document body.
    async fn body_text(&self) -> Result<String>;

    /// Most recent failed (status >= 400) response whose URL contains the
    /// given fragment, if the engine supports response interception.
    ///
    /// Engines without interception return `Ok(None)`; the classifier then
    /// relies on page text alone.
    async fn failed_response(&self, url_fragment: &str) -> Result<Option<ResponseRecord>>;

    /// Captures a screenshot as PNG bytes, for debug artifacts.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Releases engine-side resources. Best-effort: called exactly once by
    /// the provisioner during session release and never raises.
    async fn close(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
