//! Attempt orchestration.
//!
//! [`FlowController::run_attempt`] owns the whole lifecycle of one
//! identifier: session acquisition, the wizard steps, the post-submission
//! classifier window, code entry, profile completion, and confirmation.
//!
//! Two guarantees hold on every path out of an attempt, including errors
//! and shutdown:
//!
//! - exactly one outcome row is committed to the ledger
//! - the session, if one was acquired, is released exactly once,
//!   strictly after the commit

// ============================================================================
// Imports
// ============================================================================

mod outcome;
mod state;

pub use outcome::Outcome;
pub use state::{FlowEvent, FlowState, transition};

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::accounts::{AccountRecord, AccountStore};
use crate::captcha::{ChallengeDescriptor, ChallengeSolver};
use crate::classifier::{SignalClassifier, Verdict};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityGenerator};
use crate::ledger::OutcomeLedger;
use crate::otp::CodeProvider;
use crate::page::PageDriver;
use crate::phone::PhoneNumber;
use crate::session::Provisioner;
use crate::shutdown::Shutdown;
use crate::steps::StepExecutor;

// ============================================================================
// AttemptEnd
// ============================================================================

/// How the wizard portion of an attempt ended. Mechanical failures travel
/// as errors; site-decided failures travel here with their reason.
enum AttemptEnd {
    Completed(Identity),
    Failed(String),
}

// ============================================================================
// FlowController
// ============================================================================

/// Runs signup attempts end to end.
pub struct FlowController {
    config: Arc<Config>,
    classifier: SignalClassifier,
    identities: IdentityGenerator,
    accounts: AccountStore,
    provisioner: Arc<dyn Provisioner>,
    code_provider: Arc<dyn CodeProvider>,
    solver: Option<Arc<dyn ChallengeSolver>>,
    ledger: Arc<OutcomeLedger>,
}

impl FlowController {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        provisioner: Arc<dyn Provisioner>,
        code_provider: Arc<dyn CodeProvider>,
        solver: Option<Arc<dyn ChallengeSolver>>,
        ledger: Arc<OutcomeLedger>,
    ) -> Self {
        Self {
            classifier: SignalClassifier::new(&config, &config.selectors),
            identities: IdentityGenerator::new(),
            accounts: AccountStore::new(config.paths.accounts_dir.clone()),
            config,
            provisioner,
            code_provider,
            solver,
            ledger,
        }
    }

    /// Runs one attempt for one claimed identifier.
    ///
    /// Always commits exactly one outcome row, then releases the session
    /// if one was acquired. The returned error is reserved for
    /// process-fatal conditions, in practice an unwritable ledger.
    pub async fn run_attempt(
        &self,
        phone: PhoneNumber,
        shutdown: &mut Shutdown,
    ) -> Result<Outcome> {
        let started = Instant::now();
        let attempt_id = uuid::Uuid::new_v4();
        info!(
            attempt_id = %attempt_id,
            phone = %phone,
            country = %phone.iso_country(),
            "Attempt started"
        );

        let session = match self.provisioner.acquire(phone.iso_country()).await {
            Ok(session) => session,
            Err(e) => {
                let outcome = Outcome::failure(
                    phone,
                    FlowState::Initialized,
                    e.to_string(),
                    started.elapsed(),
                );
                self.ledger.commit(&outcome.to_row()).await?;
                return Ok(outcome);
            }
        };

        let mut reached = FlowState::Initialized;
        let driver = Arc::clone(&session.driver);
        let end = self
            .drive(driver.as_ref(), &phone, &mut reached, shutdown)
            .await;

        let outcome = match end {
            Ok(AttemptEnd::Completed(identity)) => {
                let record = AccountRecord::new(&phone, &identity);
                // The export is a convenience copy; the ledger row below is
                // the authoritative record.
                if let Err(e) = self.accounts.save(&record) {
                    error!(phone = %phone, error = %e, "Account export failed");
                }
                Outcome::success(phone, started.elapsed())
            }
            Ok(AttemptEnd::Failed(reason)) => {
                Outcome::failure(phone, reached, reason, started.elapsed())
            }
            Err(e) => Outcome::failure(phone, reached, e.to_string(), started.elapsed()),
        };

        if !outcome.succeeded {
            self.capture_failure_screenshot(driver.as_ref(), &outcome)
                .await;
        }

        // Commit first, release second: a crash between the two loses a
        // browser profile, never an outcome.
        let committed = self.ledger.commit(&outcome.to_row()).await;
        self.provisioner.release(session).await;
        committed?;

        info!(
            attempt_id = %attempt_id,
            phone = %outcome.phone,
            succeeded = outcome.succeeded,
            step_reached = %outcome.step_reached,
            reason = outcome.failure_reason.as_deref().unwrap_or(""),
            duration_ms = outcome.duration.as_millis() as u64,
            "Attempt finished"
        );
        Ok(outcome)
    }

    /// Drives the wizard itself, advancing `reached` as steps land.
    async fn drive(
        &self,
        driver: &dyn PageDriver,
        phone: &PhoneNumber,
        reached: &mut FlowState,
        shutdown: &mut Shutdown,
    ) -> Result<AttemptEnd> {
        let steps = StepExecutor::new(driver, &self.config.selectors, &self.config.timeouts);

        steps.navigate_to_signup(&self.config.site.signup_url).await?;
        advance(reached, FlowEvent::PageLoaded);

        if shutdown.is_triggered() {
            return Ok(AttemptEnd::Failed("shutdown".to_string()));
        }

        let country_selected = steps.select_country(phone).await?;
        steps.enter_phone(phone, country_selected).await?;
        steps.submit_phone().await?;
        advance(reached, FlowEvent::PhoneSubmitted);

        let mut verdict = self.classifier.poll(driver, shutdown).await;
        if let Verdict::DefiniteFailure(reason) = &verdict {
            if reason == "challenge presented" {
                if let Some(retry) = self.attempt_challenge(driver, shutdown).await {
                    verdict = retry;
                }
            }
        }
        match verdict {
            Verdict::Success => advance(reached, FlowEvent::CodeDispatched),
            Verdict::DefiniteFailure(reason) | Verdict::AmbiguousFailure(reason) => {
                return Ok(AttemptEnd::Failed(reason));
            }
            Verdict::Pending => unreachable!("poll never returns pending"),
        }

        // The provider owns the deadline; the outer cap is twice that and
        // only guards against a provider that ignores it.
        let otp_wait = self.config.timeouts.otp_wait();
        let code = tokio::select! {
            result = tokio::time::timeout(
                otp_wait * 2,
                self.code_provider.get_code(phone, otp_wait),
            ) => match result {
                Ok(code) => code?,
                Err(_) => {
                    warn!(phone = %phone, "Code provider overran its deadline");
                    return Ok(AttemptEnd::Failed("otp_timeout".to_string()));
                }
            },
            _ = shutdown.triggered() => {
                return Ok(AttemptEnd::Failed("shutdown".to_string()));
            }
        };
        let Some(code) = code else {
            return Ok(AttemptEnd::Failed("otp_not_provided".to_string()));
        };

        steps.enter_code(&code).await?;
        steps.submit_code().await?;
        // The profile form appearing is the only proof the code was
        // accepted; a page stuck on code entry means the code was wrong or
        // the verification stalled.
        if let Err(e) = steps.wait_profile_form().await {
            return if matches!(e, Error::ElementNotFound { .. }) {
                Ok(AttemptEnd::Failed("otp_timeout".to_string()))
            } else {
                Err(e)
            };
        }
        advance(reached, FlowEvent::CodeAccepted);

        if shutdown.is_triggered() {
            return Ok(AttemptEnd::Failed("shutdown".to_string()));
        }

        let identity = self.identities.generate();
        steps.fill_profile(&identity).await?;
        steps.submit_agreement().await?;
        advance(reached, FlowEvent::ProfileSubmitted);

        if steps.signup_confirmed().await? {
            advance(reached, FlowEvent::Confirmed);
            Ok(AttemptEnd::Completed(identity))
        } else {
            Ok(AttemptEnd::Failed("confirmation_missing".to_string()))
        }
    }

    /// Saves a debug screenshot of the failed page next to the other run
    /// artifacts. Best-effort: a failed capture never affects the attempt.
    async fn capture_failure_screenshot(&self, driver: &dyn PageDriver, outcome: &Outcome) {
        let bytes = match driver.screenshot().await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return,
            Err(e) => {
                warn!(phone = %outcome.phone, error = %e, "Screenshot capture failed");
                return;
            }
        };

        let dir = &self.config.paths.screenshots_dir;
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "Cannot create screenshot directory");
            return;
        }
        let name = format!(
            "{}_{}_{}.png",
            outcome.phone.digits(),
            outcome.step_reached,
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        );
        let path = dir.join(name);
        match std::fs::write(&path, bytes) {
            Ok(()) => info!(path = %path.display(), "Failure screenshot saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "Screenshot write failed"),
        }
    }

    /// Tries the configured solver against a presented challenge, then
    /// re-opens the classifier window exactly once. `None` means no solver
    /// or no answer, and the original failure stands.
    async fn attempt_challenge(
        &self,
        driver: &dyn PageDriver,
        shutdown: &mut Shutdown,
    ) -> Option<Verdict> {
        let solver = self.solver.as_ref()?;

        let page_url = driver.page_url().await.unwrap_or_default();
        let site_key = &self.config.captcha.site_key;
        let challenge = ChallengeDescriptor {
            page_url,
            site_key: (!site_key.is_empty()).then(|| site_key.clone()),
        };
        match solver.solve(&challenge).await {
            Ok(Some(_token)) => {
                info!("Challenge solved, re-opening classifier window");
                Some(self.classifier.poll(driver, shutdown).await)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Challenge solve failed");
                None
            }
        }
    }

}

/// Applies an event, holding the state if the transition is illegal. An
/// illegal transition here is a controller bug, so it is logged loudly.
fn advance(state: &mut FlowState, event: FlowEvent) {
    match transition(*state, event) {
        Some(next) => *state = next,
        None => error!(?state, ?event, "Illegal flow transition ignored"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::fingerprint::Fingerprint;
    use crate::otp::testing::FixedCodeProvider;
    use crate::page::scripted::{ScriptedDriver, Snapshot};
    use crate::page::Locator;
    use crate::session::{Session, SessionHandle};

    // ------------------------------------------------------------------
    // Stubs
    // ------------------------------------------------------------------

    struct StubProvisioner {
        driver: Arc<ScriptedDriver>,
        fail_acquire: AtomicBool,
        released: AtomicUsize,
    }

    impl StubProvisioner {
        fn new(driver: Arc<ScriptedDriver>) -> Self {
            Self {
                driver,
                fail_acquire: AtomicBool::new(false),
                released: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provisioner for StubProvisioner {
        async fn acquire(&self, iso_country: &str) -> Result<Session> {
            if self.fail_acquire.load(Ordering::SeqCst) {
                return Err(Error::provisioning("allocator unreachable"));
            }
            Ok(Session {
                handle: SessionHandle {
                    profile_id: "stub-profile".to_string(),
                    connect_endpoint: url::Url::parse("http://127.0.0.1:9999/").unwrap(),
                },
                fingerprint: Fingerprint::for_route(
                    iso_country,
                    &crate::config::AllocatorConfig::default(),
                ),
                driver: self.driver.clone(),
            })
        }

        async fn release(&self, _session: Session) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct StubSolver {
        seen_site_key: parking_lot::Mutex<Option<String>>,
    }

    #[async_trait]
    impl ChallengeSolver for StubSolver {
        async fn solve(&self, challenge: &ChallengeDescriptor) -> Result<Option<String>> {
            *self.seen_site_key.lock() = challenge.site_key.clone();
            Ok(Some("solved-token".to_string()))
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn test_config(dir: &tempfile::TempDir) -> Arc<Config> {
        let mut config = Config::default();
        config.timeouts.navigation_ms = 500;
        config.timeouts.step_ms = 50;
        config.timeouts.classifier_budget_ms = 500;
        config.timeouts.poll_interval_ms = 10;
        config.timeouts.otp_wait_ms = 500;
        config.paths.ledger = dir.path().join("outcomes.csv");
        config.paths.accounts_dir = dir.path().join("accounts");
        config.paths.screenshots_dir = dir.path().join("screenshots");
        Arc::new(config)
    }

    fn screenshot_count(config: &Config) -> usize {
        match std::fs::read_dir(&config.paths.screenshots_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    /// Phone entry stage: form, country select, phone input, live submit.
    fn entry_snapshot() -> Snapshot {
        Snapshot::with_text("Welcome, sign up to continue")
            .element(Locator::test_id("login-pane"))
            .element(Locator::test_id("login-signup-countrycode"))
            .element(Locator::test_id("login-signup-phonenumber"))
            .element(Locator::test_id("signup-login-submit-btn"))
    }

    /// Everything after the code was dispatched: code entry, profile form,
    /// agreement, and the explicit success marker.
    fn completion_snapshot() -> Snapshot {
        Snapshot::with_text("Finish signing up")
            .element(Locator::attr("autocomplete", "one-time-code"))
            .element(Locator::role_text("button", "Verify"))
            .element(Locator::attr("name", "firstName"))
            .element(Locator::attr("name", "lastName"))
            .element(Locator::css("input[type='email']"))
            .element(Locator::css("input[type='password']"))
            .element(Locator::role_text("button", "Agree and continue"))
            .element(Locator::test_id("signup-success"))
    }

    fn controller(
        config: Arc<Config>,
        provisioner: Arc<StubProvisioner>,
        code: Option<&str>,
        solver: Option<Arc<dyn ChallengeSolver>>,
        ledger: Arc<OutcomeLedger>,
    ) -> FlowController {
        FlowController::new(
            config,
            provisioner,
            Arc::new(FixedCodeProvider(code.map(str::to_string))),
            solver,
            ledger,
        )
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+380501112233").unwrap()
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_attempt_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
            completion_snapshot(),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver.clone()));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::Completed);
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);

        let committed = ledger.read_committed().unwrap();
        assert_eq!(committed.len(), 1);
        assert!(committed["380501112233"].succeeded);
    }

    #[tokio::test]
    async fn test_definite_failure_commits_and_releases_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Too many attempts. Try again later."),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::PhoneSubmitted);
        assert_eq!(outcome.failure_reason.as_deref(), Some("too many attempts"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_failure_commits_without_release() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::single(entry_snapshot()));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        provisioner.fail_acquire.store(true, Ordering::SeqCst);
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::Initialized);
        // Nothing was acquired, so nothing to release.
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_step_error_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::single(entry_snapshot()));
        driver.fail_click.store(true, Ordering::SeqCst);
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::Navigated);
        assert!(outcome
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("scripted click failure"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_submit_button_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        // Everything renders except the continue button.
        let driver = Arc::new(ScriptedDriver::single(
            Snapshot::with_text("Welcome, sign up to continue")
                .element(Locator::test_id("login-pane"))
                .element(Locator::test_id("login-signup-countrycode"))
                .element(Locator::test_id("login-signup-phonenumber")),
        ));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::Navigated);
        assert!(outcome
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("submit_phone"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_code_is_recorded_as_not_provided() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), None, None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::OtpPending);
        assert_eq!(outcome.failure_reason.as_deref(), Some("otp_not_provided"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stuck_code_entry_is_otp_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        // The code goes in but the profile form never renders.
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
            Snapshot::with_text("Enter your code")
                .element(Locator::attr("autocomplete", "one-time-code"))
                .element(Locator::role_text("button", "Verify")),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::OtpPending);
        assert_eq!(outcome.failure_reason.as_deref(), Some("otp_timeout"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_overrunning_deadline_is_otp_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));

        // Ignores the deadline it was handed entirely.
        struct HangingProvider;
        #[async_trait]
        impl CodeProvider for HangingProvider {
            async fn get_code(
                &self,
                _phone: &PhoneNumber,
                _deadline: Duration,
            ) -> Result<Option<String>> {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }

        let flow = FlowController::new(
            config,
            provisioner.clone(),
            Arc::new(HangingProvider),
            None,
            ledger.clone(),
        );
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.step_reached, FlowState::OtpPending);
        assert_eq!(outcome.failure_reason.as_deref(), Some("otp_timeout"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_saves_screenshot_and_success_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Too many attempts. Try again later."),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(
            config.clone(),
            provisioner.clone(),
            Some("482913"),
            None,
            ledger.clone(),
        );
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(screenshot_count(&config), 1);

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
            completion_snapshot(),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(
            config.clone(),
            provisioner,
            Some("482913"),
            None,
            ledger,
        );
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(screenshot_count(&config), 0);
    }

    #[tokio::test]
    async fn test_challenge_without_solver_is_definite_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Confirm you're human").element(Locator::css("#captcha")),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let flow = controller(config, provisioner.clone(), Some("482913"), None, ledger.clone());
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("challenge presented")
        );
    }

    #[tokio::test]
    async fn test_solved_challenge_reopens_classifier_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Confirm you're human").element(Locator::css("#captcha")),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
            completion_snapshot(),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
        let solver = Arc::new(StubSolver::default());
        let flow = controller(
            config,
            provisioner.clone(),
            Some("482913"),
            Some(solver.clone() as Arc<dyn ChallengeSolver>),
            ledger.clone(),
        );
        let (_handle, mut shutdown) = Shutdown::new();

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();
        assert!(outcome.succeeded);
        // The solver is handed the configured provider key.
        assert_eq!(
            solver.seen_site_key.lock().as_deref(),
            Some("2F0D6CB5-ACAC-4EA9-9B2A-A5F90A2DF15E")
        );
    }

    #[tokio::test]
    async fn test_shutdown_during_otp_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let driver = Arc::new(ScriptedDriver::new(vec![
            entry_snapshot(),
            Snapshot::with_text("Enter the code we've sent via SMS to +380 50 111 22 33"),
        ]));
        let provisioner = Arc::new(StubProvisioner::new(driver));
        let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));

        struct NeverProvider;
        #[async_trait]
        impl CodeProvider for NeverProvider {
            async fn get_code(
                &self,
                _phone: &PhoneNumber,
                _deadline: Duration,
            ) -> Result<Option<String>> {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }

        let flow = FlowController::new(
            config,
            provisioner.clone(),
            Arc::new(NeverProvider),
            None,
            ledger.clone(),
        );
        let (handle, mut shutdown) = Shutdown::new();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.trigger();
        });

        let outcome = flow.run_attempt(phone(), &mut shutdown).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_reason.as_deref(), Some("shutdown"));
        assert_eq!(provisioner.released.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.read_committed().unwrap().len(), 1);
    }
}
