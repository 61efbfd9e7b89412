//! Element locator strategies.
//!
//! The target site's markup is unstable, so every step carries an ordered
//! list of alternative [`Locator`]s; the step executor walks the list and
//! the first strategy that resolves wins.
//!
//! # Example
//!
//! ```ignore
//! use signup_runner::page::Locator;
//!
//! let candidates = vec![
//!     Locator::test_id("login-signup-phonenumber"),
//!     Locator::css("input[type='tel']"),
//!     Locator::attr("autocomplete", "tel-national"),
//! ];
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Locator Enum
// ============================================================================

/// Element locator strategy.
///
/// Tagged variants so candidate chains can be supplied as configuration
/// data alongside the phrase sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum Locator {
    /// `data-testid` attribute match. Most stable against restyles.
    #[serde(rename = "testId")]
    TestId(String),

    /// Raw CSS selector.
    #[serde(rename = "css")]
    Css(String),

    /// ARIA role plus visible text, `(role, text)`.
    #[serde(rename = "roleText")]
    RoleText(String, String),

    /// Arbitrary attribute match, `(name, value)`.
    #[serde(rename = "attr")]
    Attr(String, String),

    /// Exact visible text content.
    #[serde(rename = "text")]
    Text(String),

    /// XPath expression.
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    /// Creates a `data-testid` locator.
    #[inline]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Creates a CSS locator.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates a role-and-text locator.
    #[inline]
    pub fn role_text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self::RoleText(role.into(), text.into())
    }

    /// Creates an attribute locator.
    #[inline]
    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attr(name.into(), value.into())
    }

    /// Creates an exact-text locator.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates an XPath locator.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Renders the locator as a CSS selector where the strategy has a
    /// direct CSS form, or an XPath expression otherwise.
    ///
    /// Wire-protocol drivers only speak `css selector` and `xpath`, so the
    /// remaining variants lower onto those.
    #[must_use]
    pub fn to_wire(&self) -> WireSelector {
        match self {
            Self::TestId(id) => WireSelector::css(format!("[data-testid=\"{id}\"]")),
            Self::Css(sel) => WireSelector::css(sel.clone()),
            Self::Attr(name, value) => WireSelector::css(format!("[{name}=\"{value}\"]")),
            Self::RoleText(role, text) => WireSelector::xpath(format!(
                "//*[@role=\"{role}\"][contains(normalize-space(.), \"{text}\")]"
            )),
            Self::Text(text) => {
                WireSelector::xpath(format!("//*[normalize-space(text())=\"{text}\"]"))
            }
            Self::XPath(expr) => WireSelector::xpath(expr.clone()),
        }
    }
}

// ============================================================================
// WireSelector
// ============================================================================

/// A locator lowered to one of the two wire strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireSelector {
    /// W3C locator strategy name: `"css selector"` or `"xpath"`.
    pub using: &'static str,
    /// Selector value.
    pub value: String,
}

impl WireSelector {
    #[inline]
    fn css(value: String) -> Self {
        Self {
            using: "css selector",
            value,
        }
    }

    #[inline]
    fn xpath(value: String) -> Self {
        Self {
            using: "xpath",
            value,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
