//! Candidate locator chains for each wizard target.
//!
//! The site ships markup changes without notice, so nothing here is a single
//! selector: every target is an ordered chain, most stable strategy first
//! (`data-testid`, then structural attributes, then text). The whole book is
//! serde-configurable so operators can patch chains without a rebuild, the
//! same way the phrase sets are patched.

use serde::{Deserialize, Serialize};

use super::locator::Locator;

// ============================================================================
// SelectorBook
// ============================================================================

/// Ordered candidate chains, one per wizard target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorBook {
    /// Signup form / modal presence markers.
    pub signup_form: Vec<Locator>,
    /// Native country-code `<select>`.
    pub country_select: Vec<Locator>,
    /// Phone number input.
    pub phone_input: Vec<Locator>,
    /// Continue / submit button for the phone step.
    pub continue_button: Vec<Locator>,
    /// Single-field OTP inputs (tried before per-digit inputs).
    pub code_input_single: Vec<Locator>,
    /// Per-digit numeric OTP inputs.
    pub code_input_numeric: Vec<Locator>,
    /// Verify / submit button for the OTP step.
    pub verify_button: Vec<Locator>,
    /// Profile form presence markers (also the downstream OTP-verified signal).
    pub profile_form: Vec<Locator>,
    /// First name input.
    pub first_name: Vec<Locator>,
    /// Last name input.
    pub last_name: Vec<Locator>,
    /// Email input.
    pub email: Vec<Locator>,
    /// Password input.
    pub password: Vec<Locator>,
    /// Birth date input (single field form).
    pub birth_date: Vec<Locator>,
    /// Final agreement / create-account button.
    pub agreement_button: Vec<Locator>,
    /// Challenge widget markers. Presence means the attempt is burned
    /// unless a solver is configured.
    pub challenge_markers: Vec<Locator>,
    /// Explicit post-signup success markers.
    pub success_markers: Vec<Locator>,
}

impl Default for SelectorBook {
    fn default() -> Self {
        Self {
            signup_form: vec![
                Locator::test_id("login-pane"),
                Locator::test_id("auth-form"),
                Locator::attr("role", "dialog"),
                Locator::css("input[type='tel']"),
            ],
            country_select: vec![
                Locator::test_id("login-signup-countrycode"),
                Locator::css("select#country"),
                Locator::css("select[id*='country']"),
            ],
            phone_input: vec![
                Locator::test_id("login-signup-phonenumber"),
                Locator::css("input[type='tel']"),
                Locator::attr("autocomplete", "tel-national"),
                Locator::attr("autocomplete", "tel"),
            ],
            continue_button: vec![
                Locator::test_id("signup-login-submit-btn"),
                Locator::role_text("button", "Continue"),
                Locator::css("button[type='submit']"),
            ],
            code_input_single: vec![
                Locator::attr("autocomplete", "one-time-code"),
                Locator::attr("name", "code"),
                Locator::attr("name", "otp"),
            ],
            code_input_numeric: vec![Locator::css("input[inputmode='numeric']")],
            verify_button: vec![
                Locator::role_text("button", "Verify"),
                Locator::role_text("button", "Continue"),
                Locator::css("button[type='submit']"),
            ],
            profile_form: vec![
                Locator::attr("name", "firstName"),
                Locator::attr("autocomplete", "given-name"),
                Locator::text("Finish signing up"),
            ],
            first_name: vec![
                Locator::attr("name", "firstName"),
                Locator::attr("autocomplete", "given-name"),
            ],
            last_name: vec![
                Locator::attr("name", "lastName"),
                Locator::attr("autocomplete", "family-name"),
            ],
            email: vec![
                Locator::css("input[type='email']"),
                Locator::attr("name", "email"),
            ],
            password: vec![Locator::css("input[type='password']")],
            birth_date: vec![Locator::attr("name", "birthdate")],
            agreement_button: vec![
                Locator::role_text("button", "Agree and continue"),
                Locator::role_text("button", "Sign up"),
                Locator::role_text("button", "Create account"),
                Locator::css("button[type='submit']"),
            ],
            challenge_markers: vec![
                Locator::css("iframe[src*='captcha']"),
                Locator::css("iframe[src*='arkoselabs']"),
                Locator::css("iframe[src*='funcaptcha']"),
                Locator::css("#captcha"),
                Locator::test_id("captcha"),
            ],
            success_markers: vec![
                Locator::text("You're all set"),
                Locator::role_text("heading", "Welcome"),
                Locator::test_id("signup-success"),
            ],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
