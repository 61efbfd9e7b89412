//! Wizard step execution.
//!
//! Each step owns an ordered candidate chain from the
//! [`SelectorBook`](crate::page::SelectorBook) and walks it until one
//! strategy resolves, rescanning until the step budget runs out. Two
//! distinct failures come out of a step:
//!
//! - [`Error::ElementNotFound`]: no candidate resolved within the budget
//! - [`Error::InteractionRejected`]: a target resolved but refused the
//!   action, typically a submit button that never enabled
//!
//! Both end the attempt; the retry unit is a fresh attempt with a new
//! session, never a sub-step retry.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TimeoutConfig;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::page::{ElementRef, Locator, PageDriver, SelectorBook};
use crate::phone::PhoneNumber;

// ============================================================================
// Constants
// ============================================================================

/// Pause between candidate-chain rescans.
const RESCAN_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// StepExecutor
// ============================================================================

/// Drives the signup wizard over an abstract page driver.
pub struct StepExecutor<'a> {
    driver: &'a dyn PageDriver,
    book: &'a SelectorBook,
    timeouts: &'a TimeoutConfig,
}

impl<'a> StepExecutor<'a> {
    #[must_use]
    pub fn new(
        driver: &'a dyn PageDriver,
        book: &'a SelectorBook,
        timeouts: &'a TimeoutConfig,
    ) -> Self {
        Self {
            driver,
            book,
            timeouts,
        }
    }

    // ========================================================================
    // Chain Walking
    // ========================================================================

    /// Walks a candidate chain until a visible element resolves, rescanning
    /// within the step budget.
    async fn locate(&self, step: &str, chain: &[Locator]) -> Result<ElementRef> {
        let deadline = Instant::now() + self.timeouts.step();
        loop {
            for locator in chain {
                if let Some(element) = self.driver.find(locator).await? {
                    if self.driver.is_visible(&element).await? {
                        debug!(step, ?locator, "Candidate resolved");
                        return Ok(element);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::element_not_found(step, chain.len()));
            }
            tokio::time::sleep(RESCAN_INTERVAL).await;
        }
    }

    /// Like [`Self::locate`] but clicks the element, waiting for it to
    /// enable. A target that stays disabled through the budget is an
    /// [`Error::InteractionRejected`], kept distinct from a missing one.
    async fn click_when_enabled(&self, step: &str, chain: &[Locator]) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.step();
        let mut saw_disabled = false;
        loop {
            for locator in chain {
                if let Some(element) = self.driver.find(locator).await? {
                    if !self.driver.is_visible(&element).await? {
                        continue;
                    }
                    if self.driver.is_enabled(&element).await? {
                        self.driver.click(&element).await?;
                        debug!(step, ?locator, "Clicked");
                        return Ok(());
                    }
                    saw_disabled = true;
                }
            }
            if Instant::now() >= deadline {
                return if saw_disabled {
                    Err(Error::interaction_rejected(step, "target never enabled"))
                } else {
                    Err(Error::element_not_found(step, chain.len()))
                };
            }
            tokio::time::sleep(RESCAN_INTERVAL).await;
        }
    }

    // ========================================================================
    // Phone Entry
    // ========================================================================

    /// Loads the signup page and waits for the form to render.
    pub async fn navigate_to_signup(&self, url: &str) -> Result<()> {
        info!(url, "Opening signup page");
        tokio::time::timeout(self.timeouts.navigation(), self.driver.navigate(url))
            .await
            .map_err(|_| Error::timeout("navigate_to_signup", self.timeouts.navigation_ms))??;
        self.locate("signup_form", &self.book.signup_form).await?;
        Ok(())
    }

    /// Selects the country in the native `<select>`, using the site's
    /// `{dial_code}{ISO2}` value form.
    ///
    /// Returns whether a selection was made: some layouts infer the country
    /// from egress geolocation and render no select at all, which is not a
    /// failure.
    pub async fn select_country(&self, phone: &PhoneNumber) -> Result<bool> {
        match self.locate("select_country", &self.book.country_select).await {
            Ok(element) => {
                let value = phone.country_select_value();
                self.driver.select_value(&element, &value).await?;
                info!(country = %phone.iso_country(), value = %value, "Country selected");
                Ok(true)
            }
            Err(Error::ElementNotFound { .. }) => {
                warn!(
                    country = %phone.iso_country(),
                    "No country select rendered, relying on inferred country"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Fills the phone input. The local part goes in when the country was
    /// selected explicitly, the full number otherwise.
    pub async fn enter_phone(&self, phone: &PhoneNumber, country_selected: bool) -> Result<()> {
        let element = self.locate("enter_phone", &self.book.phone_input).await?;
        let value = if country_selected {
            phone.local_part().to_string()
        } else {
            phone.formatted()
        };
        self.driver.fill(&element, &value).await?;
        debug!(phone = %phone, country_selected, "Phone entered");
        Ok(())
    }

    /// Submits the phone step.
    pub async fn submit_phone(&self) -> Result<()> {
        self.click_when_enabled("submit_phone", &self.book.continue_button)
            .await
    }

    // ========================================================================
    // OTP Entry
    // ========================================================================

    /// Enters the verification code.
    ///
    /// Single-field inputs take the whole code; per-digit layouts get the
    /// code typed as keystrokes into the first box, which auto-advances
    /// focus on every digit.
    pub async fn enter_code(&self, code: &str) -> Result<()> {
        for locator in &self.book.code_input_single {
            if let Some(element) = self.driver.find(locator).await? {
                if self.driver.is_visible(&element).await? {
                    self.driver.fill(&element, code).await?;
                    debug!(?locator, "Code filled into single input");
                    return Ok(());
                }
            }
        }

        let element = self.locate("enter_code", &self.book.code_input_numeric).await?;
        self.driver.type_text(&element, code).await?;
        debug!("Code typed into per-digit inputs");
        Ok(())
    }

    /// Submits the code. Many layouts auto-submit on the last digit and
    /// render no button; that is not a failure.
    pub async fn submit_code(&self) -> Result<()> {
        match self
            .click_when_enabled("submit_code", &self.book.verify_button)
            .await
        {
            Ok(()) => Ok(()),
            Err(Error::ElementNotFound { .. }) => {
                debug!("No verify button, assuming auto-submit");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Waits for the profile form, the downstream proof that the code was
    /// accepted.
    pub async fn wait_profile_form(&self) -> Result<()> {
        self.locate("wait_profile_form", &self.book.profile_form)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Profile Completion
    // ========================================================================

    /// Fills the profile form. Name, email, and password are required;
    /// the birth date input is optional because several variants omit it.
    pub async fn fill_profile(&self, identity: &Identity) -> Result<()> {
        let first = self.locate("fill_profile", &self.book.first_name).await?;
        self.driver.fill(&first, &identity.first_name).await?;

        let last = self.locate("fill_profile", &self.book.last_name).await?;
        self.driver.fill(&last, &identity.last_name).await?;

        let email = self.locate("fill_profile", &self.book.email).await?;
        self.driver.fill(&email, &identity.email).await?;

        let password = self.locate("fill_profile", &self.book.password).await?;
        self.driver.fill(&password, &identity.password).await?;

        match self.locate("fill_profile", &self.book.birth_date).await {
            Ok(element) => {
                self.driver
                    .fill(&element, &identity.birth_date_input())
                    .await?;
            }
            Err(Error::ElementNotFound { .. }) => {
                debug!("No birth date input on this variant");
            }
            Err(e) => return Err(e),
        }

        info!(email = %identity.email, "Profile filled");
        Ok(())
    }

    /// Clicks the final agreement button.
    pub async fn submit_agreement(&self) -> Result<()> {
        self.click_when_enabled("submit_agreement", &self.book.agreement_button)
            .await
    }

    /// Confirms the signup completed: an explicit success marker, or the
    /// profile form gone after submission.
    pub async fn signup_confirmed(&self) -> Result<bool> {
        let deadline = Instant::now() + self.timeouts.step();
        loop {
            for marker in &self.book.success_markers {
                if self.driver.find(marker).await?.is_some() {
                    return Ok(true);
                }
            }

            let mut form_present = false;
            for locator in &self.book.profile_form {
                if self.driver.find(locator).await?.is_some() {
                    form_present = true;
                    break;
                }
            }
            if !form_present {
                return Ok(true);
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(RESCAN_INTERVAL).await;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
