//! Runner configuration.
//!
//! One [`Config`] value is constructed at process start (defaults, optionally
//! overlaid from a JSON file) and passed by reference into each component.
//! There is no ambient global lookup anywhere in the core.
//!
//! The classifier's failure/success phrase sets live here as data, not as
//! algorithmic constants: the target site rewords them without notice and
//! operators patch the lists between releases.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::page::SelectorBook;

// ============================================================================
// Config
// ============================================================================

/// Top-level runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target site settings.
    pub site: SiteConfig,
    /// Timeout and polling budgets.
    pub timeouts: TimeoutConfig,
    /// File locations.
    pub paths: PathConfig,
    /// Egress proxy settings.
    pub proxy: ProxyConfig,
    /// Browser-profile allocator settings.
    pub allocator: AllocatorConfig,
    /// Challenge-solver settings.
    pub captcha: CaptchaConfig,
    /// Classifier phrase sets.
    pub phrases: PhraseConfig,
    /// Candidate locator chains, patchable the same way the phrases are.
    pub selectors: SelectorBook,
}

impl Config {
    /// Loads configuration from a JSON file.
    ///
    /// Missing keys fall back to defaults section by section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no component can act on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.proxy.port_range_end < self.proxy.port_range_start {
            return Err(Error::config(format!(
                "proxy port range is inverted: {}..{}",
                self.proxy.port_range_start, self.proxy.port_range_end
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be nonzero"));
        }
        Ok(())
    }
}

// ============================================================================
// Site
// ============================================================================

/// Target site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Signup entry URL.
    pub signup_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            signup_url: "https://www.airbnb.com/signup_login".to_string(),
        }
    }
}

// ============================================================================
// Timeouts
// ============================================================================

/// Timeout and polling budgets, in milliseconds on the wire.
///
/// Every bounded wait in the core reads from here; there is no retry-forever
/// loop anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Initial navigation budget.
    pub navigation_ms: u64,
    /// Per-step element location budget (all candidates together).
    pub step_ms: u64,
    /// Classifier overall budget after phone submission.
    pub classifier_budget_ms: u64,
    /// Classifier poll interval.
    pub poll_interval_ms: u64,
    /// OTP wait budget. Generous: may block on a human.
    pub otp_wait_ms: u64,
    /// Session provisioning budget.
    pub provisioning_ms: u64,
    /// Settle delay after the allocator reports ready. The endpoint is
    /// empirically not usable the instant "ready" comes back.
    pub provision_settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            step_ms: 10_000,
            classifier_budget_ms: 30_000,
            poll_interval_ms: 1_000,
            otp_wait_ms: 120_000,
            provisioning_ms: 60_000,
            provision_settle_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    /// Navigation budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Per-step budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Classifier budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn classifier_budget(&self) -> Duration {
        Duration::from_millis(self.classifier_budget_ms)
    }

    /// Classifier poll interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// OTP wait budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn otp_wait(&self) -> Duration {
        Duration::from_millis(self.otp_wait_ms)
    }

    /// Provisioning budget as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn provisioning(&self) -> Duration {
        Duration::from_millis(self.provisioning_ms)
    }

    /// Post-ready settle delay as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn provision_settle(&self) -> Duration {
        Duration::from_millis(self.provision_settle_ms)
    }
}

// ============================================================================
// Paths
// ============================================================================

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Line-oriented phone list.
    pub phone_list: PathBuf,
    /// Append-only outcome ledger (CSV).
    pub ledger: PathBuf,
    /// Directory for exported account credentials.
    pub accounts_dir: PathBuf,
    /// Directory for failure screenshots.
    pub screenshots_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            phone_list: PathBuf::from("./data/phones.txt"),
            ledger: PathBuf::from("./data/outcomes.csv"),
            accounts_dir: PathBuf::from("./data/accounts"),
            screenshots_dir: PathBuf::from("./data/screenshots"),
        }
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// Egress proxy settings.
///
/// Country targeting uses the provider's `{iso}.{domain}` host form plus a
/// rotated port from the configured range; one distinct egress identity per
/// attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Whether to route sessions through the proxy at all.
    pub enabled: bool,
    /// Default gateway host.
    pub host: String,
    /// Base domain for country-specific hosts.
    pub host_domain: String,
    /// Rotating port range start (inclusive).
    pub port_range_start: u16,
    /// Rotating port range end (inclusive).
    pub port_range_end: u16,
    /// Authentication username.
    pub username: String,
    /// Authentication password.
    pub password: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "gate.decodo.com".to_string(),
            host_domain: "decodo.com".to_string(),
            port_range_start: 40_001,
            port_range_end: 49_999,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl ProxyConfig {
    /// Country-specific gateway host, `{iso}.{domain}`.
    #[must_use]
    pub fn country_host(&self, iso_country: &str) -> String {
        if iso_country.is_empty() {
            return self.host.clone();
        }
        format!("{}.{}", iso_country.to_lowercase(), self.host_domain)
    }

    /// Username with the provider's country-targeting suffix,
    /// `user-{username}-country-{iso}`.
    #[must_use]
    pub fn country_username(&self, iso_country: &str) -> String {
        if iso_country.is_empty() {
            return self.username.clone();
        }
        format!(
            "user-{}-country-{}",
            self.username,
            iso_country.to_lowercase()
        )
    }
}

// ============================================================================
// Allocator
// ============================================================================

/// Browser-profile allocator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Launcher API base URL.
    pub base_url: String,
    /// Pre-issued bearer token.
    pub token: String,
    /// Requested browser type.
    pub browser_type: String,
    /// Requested OS type for the fingerprint.
    pub os_type: String,
    /// Whether to request headless profiles.
    pub headless: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://launcher.mlx.yt:45001".to_string(),
            token: String::new(),
            browser_type: "mimic".to_string(),
            os_type: "windows".to_string(),
            headless: false,
        }
    }
}

// ============================================================================
// Captcha
// ============================================================================

/// Challenge-solver settings. Disabled by default: a presented challenge is
/// then a definite failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Whether solving is attempted at all.
    pub enabled: bool,
    /// Solver API base URL.
    pub base_url: String,
    /// Solver API key.
    pub api_key: String,
    /// Challenge-provider public key for the target site. The widget does
    /// not expose it to the driver, so it is pinned here.
    pub site_key: String,
    /// Solve budget in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://2captcha.com".to_string(),
            api_key: String::new(),
            site_key: "2F0D6CB5-ACAC-4EA9-9B2A-A5F90A2DF15E".to_string(),
            timeout_ms: 120_000,
        }
    }
}

// ============================================================================
// Phrases
// ============================================================================

/// Classifier phrase sets. Matched case-insensitively against the whole
/// visible page text. Failure always outranks success; see the classifier
/// module for the full priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Phrases that mean the phone was definitively rejected.
    pub failure: Vec<String>,
    /// Phrases that confirm the verification code was actually dispatched.
    pub success: Vec<String>,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            failure: vec![
                "max confirmation attempts".to_string(),
                "try again in 24 hours".to_string(),
                "isn't supported".to_string(),
                "not supported".to_string(),
                "sign up using a different method".to_string(),
                "too many attempts".to_string(),
                "rate limit".to_string(),
                "temporarily blocked".to_string(),
                "try again later".to_string(),
                "something went wrong".to_string(),
                "we couldn't send".to_string(),
                "couldn't send a code".to_string(),
                "unable to send".to_string(),
                "invalid phone".to_string(),
                "phone number is invalid".to_string(),
            ],
            success: vec![
                "enter the code we've sent via sms to".to_string(),
                "enter the code we sent over sms to".to_string(),
                "enter the code we sent via sms to".to_string(),
                "we've sent via sms".to_string(),
                "sent via sms to +".to_string(),
            ],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
