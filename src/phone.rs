//! Phone number identifiers.
//!
//! A [`PhoneNumber`] is the unit of work: each one is spent on exactly one
//! signup attempt and then committed to a terminal bucket. Values are
//! immutable once parsed.
//!
//! Raw input is a line of digits with an optional leading `+`. The dial code
//! is derived by longest-prefix match against a known table; lines that are
//! empty, contain non-digits, or carry an unknown dial prefix are rejected
//! with [`Error::MalformedIdentifier`] and skipped by the loader.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Dial Code Table
// ============================================================================

/// Known dial codes mapped to ISO 3166-1 alpha-2 country codes.
///
/// Longest match wins, so three-digit codes are checked before "1" or "7".
/// Shared +1 numbers resolve to US; that is what the target site's country
/// select expects for them.
const DIAL_CODES: &[(&str, &str)] = &[
    ("380", "UA"),
    ("375", "BY"),
    ("261", "MG"),
    ("962", "JO"),
    ("972", "IL"),
    ("855", "KH"),
    ("229", "BJ"),
    ("995", "GE"),
    ("971", "AE"),
    ("977", "NP"),
    ("961", "LB"),
    ("998", "UZ"),
    ("880", "BD"),
    ("234", "NG"),
    ("254", "KE"),
    ("255", "TZ"),
    ("212", "MA"),
    ("216", "TN"),
    ("92", "PK"),
    ("44", "GB"),
    ("49", "DE"),
    ("33", "FR"),
    ("48", "PL"),
    ("91", "IN"),
    ("86", "CN"),
    ("81", "JP"),
    ("82", "KR"),
    ("61", "AU"),
    ("34", "ES"),
    ("39", "IT"),
    ("31", "NL"),
    ("65", "SG"),
    ("20", "EG"),
    ("27", "ZA"),
    ("52", "MX"),
    ("55", "BR"),
    ("60", "MY"),
    ("62", "ID"),
    ("63", "PH"),
    ("66", "TH"),
    ("84", "VN"),
    ("90", "TR"),
    ("7", "RU"),
    ("1", "US"),
];

/// Raw line shape: optional `+`, then 7 to 15 digits (E.164 bounds).
static RAW_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?([0-9]{7,15})$").expect("static regex"));

// ============================================================================
// PhoneNumber
// ============================================================================

/// An immutable phone identifier.
///
/// Derived once from a raw list line and never mutated. Equality and
/// hashing go through the full digit string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// Full number, digits only, including the dial code.
    digits: String,
    /// Country dial code (e.g. "380").
    dial_code: String,
    /// Local portion after the dial code.
    local_part: String,
    /// ISO 3166-1 alpha-2 country code (e.g. "UA").
    iso_country: String,
}

impl PhoneNumber {
    /// Parses a raw phone-list line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIdentifier`] for empty lines, lines with
    /// non-digit content, numbers outside E.164 length bounds, or numbers
    /// whose dial prefix is not in the known table.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::malformed_identifier(raw, "empty line"));
        }

        let digits = RAW_LINE
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                Error::malformed_identifier(trimmed, "expected optional '+' then 7-15 digits")
            })?;

        // Longest prefix wins: the table is ordered 3-digit codes first.
        let (dial_code, iso_country) = DIAL_CODES
            .iter()
            .find(|(code, _)| digits.starts_with(code) && digits.len() > code.len())
            .map(|(code, iso)| ((*code).to_string(), (*iso).to_string()))
            .ok_or_else(|| Error::malformed_identifier(trimmed, "unknown dial code prefix"))?;

        let local_part = digits[dial_code.len()..].to_string();

        Ok(Self {
            digits,
            dial_code,
            local_part,
            iso_country,
        })
    }

    /// Full number, digits only.
    #[inline]
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Country dial code.
    #[inline]
    #[must_use]
    pub fn dial_code(&self) -> &str {
        &self.dial_code
    }

    /// Local portion after the dial code.
    #[inline]
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// ISO 3166-1 alpha-2 country code.
    #[inline]
    #[must_use]
    pub fn iso_country(&self) -> &str {
        &self.iso_country
    }

    /// E.164 presentation with `+` prefix.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("+{}", self.digits)
    }

    /// Value the target site's native country `<select>` expects:
    /// `{dial_code}{ISO2}`, e.g. `380UA`.
    #[must_use]
    pub fn country_select_value(&self) -> String {
        format!("{}{}", self.dial_code, self.iso_country)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.digits)
    }
}

// ============================================================================
// Tests
// ============================================================================
