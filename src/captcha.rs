//! Challenge solving.
//!
//! A presented challenge burns the attempt unless a solver is configured.
//! Solving is optional and external; the flow only sees [`ChallengeSolver`]
//! and treats a `None` answer as "unsolved", which falls through to the
//! normal definite-failure path.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CaptchaConfig;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Interval between answer polls; the service asks for at least five
/// seconds between `res.php` calls.
const ANSWER_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// ChallengeDescriptor
// ============================================================================

/// What the solver needs to know about a presented challenge.
#[derive(Debug, Clone)]
pub struct ChallengeDescriptor {
    /// URL of the page showing the challenge.
    pub page_url: String,
    /// Provider site key for the target site, from configuration. `None`
    /// means the operator blanked it; the solver cannot run without one.
    pub site_key: Option<String>,
}

// ============================================================================
// ChallengeSolver Trait
// ============================================================================

/// External challenge-solving capability.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Attempts to solve; `None` means unsolved within the budget.
    async fn solve(&self, challenge: &ChallengeDescriptor) -> Result<Option<String>>;
}

// ============================================================================
// TwoCaptchaSolver
// ============================================================================

/// Solver backed by the 2captcha HTTP API.
pub struct TwoCaptchaSolver {
    http: reqwest::Client,
    config: CaptchaConfig,
}

impl TwoCaptchaSolver {
    #[must_use]
    pub fn new(http: reqwest::Client, config: CaptchaConfig) -> Self {
        Self { http, config }
    }

    async fn submit(&self, challenge: &ChallengeDescriptor) -> Result<String> {
        let site_key = challenge
            .site_key
            .as_deref()
            .ok_or_else(|| Error::driver("challenge has no extractable site key"))?;

        let url = format!("{}/in.php", self.config.base_url);
        let resp: Value = self
            .http
            .post(&url)
            .form(&[
                ("key", self.config.api_key.as_str()),
                ("method", "funcaptcha"),
                ("publickey", site_key),
                ("pageurl", challenge.page_url.as_str()),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if resp.get("status").and_then(Value::as_u64) != Some(1) {
            let detail = resp
                .get("request")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(Error::driver(format!("solver rejected task: {detail}")));
        }
        Ok(resp
            .get("request")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn fetch_answer(&self, task_id: &str) -> Result<Option<String>> {
        let url = format!("{}/res.php", self.config.base_url);
        let resp: Value = self
            .http
            .get(&url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("action", "get"),
                ("id", task_id),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if resp.get("status").and_then(Value::as_u64) == Some(1) {
            return Ok(resp
                .get("request")
                .and_then(Value::as_str)
                .map(str::to_string));
        }

        let detail = resp.get("request").and_then(Value::as_str).unwrap_or("");
        if detail == "CAPCHA_NOT_READY" {
            return Ok(None);
        }
        Err(Error::driver(format!("solver failed task: {detail}")))
    }
}

#[async_trait]
impl ChallengeSolver for TwoCaptchaSolver {
    async fn solve(&self, challenge: &ChallengeDescriptor) -> Result<Option<String>> {
        let task_id = self.submit(challenge).await?;
        info!(task_id = %task_id, page_url = %challenge.page_url, "Challenge submitted");

        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        loop {
            tokio::time::sleep(ANSWER_POLL_INTERVAL).await;
            match self.fetch_answer(&task_id).await {
                Ok(Some(token)) => {
                    debug!(task_id = %task_id, "Challenge solved");
                    return Ok(Some(token));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "Solver task failed");
                    return Ok(None);
                }
            }
            if Instant::now() >= deadline {
                warn!(task_id = %task_id, "Solver budget exhausted");
                return Ok(None);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
