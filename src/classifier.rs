//! Post-submission signal classification.
//!
//! After the phone number is submitted the page gives no single reliable
//! signal. The classifier polls a bundle of weak signals and resolves them
//! in a strict priority order:
//!
//! 1. failure phrases in the page text, or a failed verification request
//! 2. a challenge widget
//! 3. success phrases confirming the code was dispatched
//! 4. anything else, including a bare code input, stays pending
//!
//! A visible code input alone is NOT success: the site renders the input
//! before deciding whether to actually send a code, and several failure
//! banners appear next to a still-visible input. Phrase evidence outranks
//! widget evidence for exactly that reason.
//!
//! When the polling budget runs out without terminal evidence the verdict
//! is an ambiguous failure, kept distinct from definite rejection so
//! operators can tell burned numbers from undiagnosed ones.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{Config, PhraseConfig};
use crate::error::Result;
use crate::page::{Locator, PageDriver, ResponseRecord, SelectorBook};
use crate::shutdown::Shutdown;

// ============================================================================
// Constants
// ============================================================================

/// URL fragment identifying the phone-verification request, for drivers
/// that can surface failed responses.
const VERIFICATION_FRAGMENT: &str = "verification";

// ============================================================================
// Verdict
// ============================================================================

/// Classifier verdict for one polling window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No terminal evidence yet; keep polling.
    Pending,
    /// The verification code was dispatched.
    Success,
    /// The identifier was definitively rejected.
    DefiniteFailure(String),
    /// The window closed without terminal evidence, or the attempt was
    /// interrupted. The number may or may not be burned.
    AmbiguousFailure(String),
}

impl Verdict {
    /// Whether polling should stop on this verdict.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::DefiniteFailure(reason) | Self::AmbiguousFailure(reason) => Some(reason),
            _ => None,
        }
    }
}

// ============================================================================
// PageSignals
// ============================================================================

/// One observation of the page, gathered in a single polling tick.
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    /// Full visible page text.
    pub body_text: String,
    /// A challenge widget marker resolved.
    pub challenge_present: bool,
    /// A code input resolved.
    pub code_input_present: bool,
    /// A failed phone-verification request, where the driver can see one.
    pub failed_verification: Option<ResponseRecord>,
}

// ============================================================================
// classify
// ============================================================================

/// Resolves one observation against the phrase sets.
///
/// Pure: same signals and phrases, same verdict. All text matching is
/// case-insensitive substring containment.
#[must_use]
pub fn classify(signals: &PageSignals, phrases: &PhraseConfig) -> Verdict {
    let text = signals.body_text.to_lowercase();

    // Failure evidence outranks everything, including a visible code input.
    for phrase in &phrases.failure {
        if text.contains(&phrase.to_lowercase()) {
            return Verdict::DefiniteFailure(phrase.clone());
        }
    }
    if let Some(record) = &signals.failed_verification {
        if record.status >= 400 {
            return Verdict::DefiniteFailure(format!(
                "verification request failed with HTTP {}",
                record.status
            ));
        }
    }

    if signals.challenge_present {
        return Verdict::DefiniteFailure("challenge presented".to_string());
    }

    for phrase in &phrases.success {
        if text.contains(&phrase.to_lowercase()) {
            return Verdict::Success;
        }
    }

    // A bare code input is weak evidence; the dispatch confirmation phrase
    // is what actually proves a code went out.
    Verdict::Pending
}

// ============================================================================
// SignalClassifier
// ============================================================================

/// Polls page signals until a terminal verdict or budget exhaustion.
pub struct SignalClassifier {
    phrases: PhraseConfig,
    challenge_markers: Vec<Locator>,
    code_inputs: Vec<Locator>,
    budget: Duration,
    interval: Duration,
}

impl SignalClassifier {
    /// Builds a classifier from configuration and the selector book.
    #[must_use]
    pub fn new(config: &Config, selectors: &SelectorBook) -> Self {
        let mut code_inputs = selectors.code_input_single.clone();
        code_inputs.extend(selectors.code_input_numeric.iter().cloned());
        Self {
            phrases: config.phrases.clone(),
            challenge_markers: selectors.challenge_markers.clone(),
            code_inputs,
            budget: config.timeouts.classifier_budget(),
            interval: config.timeouts.poll_interval(),
        }
    }

    /// Gathers one observation.
    ///
    /// Element probes come first and the text read last, so the whole
    /// bundle describes a single page state.
    ///
    /// # Errors
    ///
    /// Propagates driver failures; the polling loop treats them as a
    /// pending tick rather than a verdict.
    pub async fn observe(&self, driver: &dyn PageDriver) -> Result<PageSignals> {
        let mut challenge_present = false;
        for marker in &self.challenge_markers {
            if driver.find(marker).await?.is_some() {
                challenge_present = true;
                break;
            }
        }

        let mut code_input_present = false;
        for locator in &self.code_inputs {
            if driver.find(locator).await?.is_some() {
                code_input_present = true;
                break;
            }
        }

        let failed_verification = driver.failed_response(VERIFICATION_FRAGMENT).await?;
        let body_text = driver.body_text().await?;

        Ok(PageSignals {
            body_text,
            challenge_present,
            code_input_present,
            failed_verification,
        })
    }

    /// Polls until a terminal verdict, budget exhaustion, or shutdown.
    ///
    /// Never returns [`Verdict::Pending`]. Observation errors are logged
    /// and the tick is wasted; persistent errors therefore surface as the
    /// budget-exhaustion ambiguous failure.
    pub async fn poll(&self, driver: &dyn PageDriver, shutdown: &mut Shutdown) -> Verdict {
        let started = Instant::now();
        let mut ticks = 0u32;

        loop {
            if shutdown.is_triggered() {
                return Verdict::AmbiguousFailure("shutdown".to_string());
            }

            ticks += 1;
            match self.observe(driver).await {
                Ok(signals) => {
                    let verdict = classify(&signals, &self.phrases);
                    debug!(
                        tick = ticks,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        challenge = signals.challenge_present,
                        code_input = signals.code_input_present,
                        ?verdict,
                        "Classifier tick"
                    );
                    if verdict.is_terminal() {
                        return verdict;
                    }
                }
                Err(e) => {
                    warn!(tick = ticks, error = %e, "Observation failed, keeping the tick");
                }
            }

            if started.elapsed() >= self.budget {
                warn!(
                    ticks,
                    budget_ms = self.budget.as_millis() as u64,
                    "Classifier budget exhausted without terminal evidence"
                );
                return Verdict::AmbiguousFailure("timeout".to_string());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.triggered() => {
                    return Verdict::AmbiguousFailure("shutdown".to_string());
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::page::scripted::{ScriptedDriver, Snapshot};

    fn phrases() -> PhraseConfig {
        PhraseConfig::default()
    }

    fn classifier(budget_ms: u64, interval_ms: u64) -> SignalClassifier {
        let mut config = Config::default();
        config.timeouts.classifier_budget_ms = budget_ms;
        config.timeouts.poll_interval_ms = interval_ms;
        SignalClassifier::new(&config, &SelectorBook::default())
    }

    fn code_input_locator() -> Locator {
        Locator::attr("autocomplete", "one-time-code")
    }

    #[test]
    fn test_failure_phrase_is_definite() {
        let signals = PageSignals {
            body_text: "Too many attempts. Try again later.".to_string(),
            ..PageSignals::default()
        };
        let verdict = classify(&signals, &phrases());
        assert_eq!(
            verdict,
            Verdict::DefiniteFailure("too many attempts".to_string())
        );
    }

    #[test]
    fn test_failure_outranks_visible_code_input() {
        let signals = PageSignals {
            body_text: "We couldn't send a code to this number".to_string(),
            code_input_present: true,
            ..PageSignals::default()
        };
        assert!(matches!(
            classify(&signals, &phrases()),
            Verdict::DefiniteFailure(_)
        ));
    }

    #[test]
    fn test_failure_outranks_success_phrase() {
        // Both banners on one page: the number is burned, not verified.
        let signals = PageSignals {
            body_text: "Enter the code we've sent via SMS to +1555. \
                        Something went wrong, try again."
                .to_string(),
            ..PageSignals::default()
        };
        assert!(matches!(
            classify(&signals, &phrases()),
            Verdict::DefiniteFailure(_)
        ));
    }

    #[test]
    fn test_failed_verification_request_is_definite() {
        let signals = PageSignals {
            failed_verification: Some(ResponseRecord {
                url: "https://api.test/v2/phone_verification".to_string(),
                status: 420,
            }),
            ..PageSignals::default()
        };
        let verdict = classify(&signals, &phrases());
        assert_eq!(
            verdict.reason(),
            Some("verification request failed with HTTP 420")
        );
    }

    #[test]
    fn test_challenge_is_definite_failure() {
        let signals = PageSignals {
            challenge_present: true,
            code_input_present: true,
            ..PageSignals::default()
        };
        assert_eq!(
            classify(&signals, &phrases()),
            Verdict::DefiniteFailure("challenge presented".to_string())
        );
    }

    #[test]
    fn test_success_phrase_is_success() {
        let signals = PageSignals {
            body_text: "Enter the code we've sent via SMS to +380 50 111 22 33".to_string(),
            code_input_present: true,
            ..PageSignals::default()
        };
        assert_eq!(classify(&signals, &phrases()), Verdict::Success);
    }

    #[test]
    fn test_bare_code_input_stays_pending() {
        let signals = PageSignals {
            body_text: "Confirm your number".to_string(),
            code_input_present: true,
            ..PageSignals::default()
        };
        assert_eq!(classify(&signals, &phrases()), Verdict::Pending);
    }

    #[tokio::test]
    async fn test_poll_resolves_on_later_tick() {
        // First observation is inconclusive, the banner lands on tick two.
        let driver = ScriptedDriver::new(vec![
            Snapshot::with_text("Confirm your number").element(code_input_locator()),
            Snapshot::with_text("Too many attempts. Try again in 24 hours."),
        ]);
        let (_handle, mut shutdown) = Shutdown::new();

        let started = std::time::Instant::now();
        let verdict = classifier(2_000, 10).poll(&driver, &mut shutdown).await;
        assert_eq!(
            verdict,
            Verdict::DefiniteFailure("try again in 24 hours".to_string())
        );
        // Resolved on the second tick, well inside the budget.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_is_ambiguous() {
        let driver = ScriptedDriver::single(
            Snapshot::with_text("Confirm your number").element(code_input_locator()),
        );
        let (_handle, mut shutdown) = Shutdown::new();

        let verdict = classifier(60, 10).poll(&driver, &mut shutdown).await;
        assert_eq!(verdict, Verdict::AmbiguousFailure("timeout".to_string()));
    }

    #[tokio::test]
    async fn test_poll_observes_shutdown() {
        let driver = ScriptedDriver::single(Snapshot::with_text("Confirm your number"));
        let (handle, mut shutdown) = Shutdown::new();
        handle.trigger();

        let verdict = classifier(60_000, 1_000).poll(&driver, &mut shutdown).await;
        assert_eq!(verdict, Verdict::AmbiguousFailure("shutdown".to_string()));
    }
}
