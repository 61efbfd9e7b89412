//! Session provisioning and release.
//!
//! Each attempt runs in a fresh isolated browser session with a
//! country-consistent fingerprint and egress route. Sessions come from an
//! upstream profile allocator over HTTP; the provisioner bounds the wait,
//! applies the post-ready settle delay, and guarantees release happens
//! exactly once per acquired session, errors or not.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AllocatorConfig, ProxyConfig, TimeoutConfig};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::page::{PageDriver, RemoteWebDriver};

// ============================================================================
// SessionHandle
// ============================================================================

/// Allocator-issued session identity.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Allocator profile id.
    pub profile_id: String,
    /// WebDriver endpoint the provisioned browser listens on.
    pub connect_endpoint: Url,
}

// ============================================================================
// Session
// ============================================================================

/// A live provisioned session.
pub struct Session {
    pub handle: SessionHandle,
    pub fingerprint: Fingerprint,
    /// Shared so callers can keep driving the page while the session value
    /// itself is parked for release.
    pub driver: Arc<dyn PageDriver>,
}

// ============================================================================
// SessionAllocator Trait
// ============================================================================

/// Upstream profile allocator.
#[async_trait]
pub trait SessionAllocator: Send + Sync {
    /// Allocates a profile routed to the given country.
    async fn allocate(&self, iso_country: &str, fingerprint: &Fingerprint)
        -> Result<SessionHandle>;

    /// Stops an allocated profile.
    async fn deallocate(&self, handle: &SessionHandle) -> Result<()>;
}

// ============================================================================
// MlxAllocator
// ============================================================================

/// HTTP allocator speaking the launcher's quick-profile API.
pub struct MlxAllocator {
    http: reqwest::Client,
    config: AllocatorConfig,
    proxy: ProxyConfig,
}

impl MlxAllocator {
    #[must_use]
    pub fn new(http: reqwest::Client, config: AllocatorConfig, proxy: ProxyConfig) -> Self {
        Self {
            http,
            config,
            proxy,
        }
    }

    /// Picks a port from the rotation range. Each port is a distinct
    /// egress identity at the provider.
    fn rotated_port(&self) -> u16 {
        // Config::load rejects inverted ranges; a hand-built config
        // degrades to the start port instead of underflowing.
        let span = u64::from(
            self.proxy
                .port_range_end
                .saturating_sub(self.proxy.port_range_start),
        ) + 1;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.proxy.port_range_start + (nanos % span) as u16
    }

    fn quick_profile_body(&self, iso_country: &str, fingerprint: &Fingerprint) -> Value {
        let mut body = json!({
            "browser_type": fingerprint.browser_type,
            "os_type": fingerprint.os_type,
            "is_headless": self.config.headless,
            "automation": "selenium",
            "parameters": {
                "fingerprint": {
                    "localization": {
                        "languages": fingerprint.accept_language,
                        "locale": fingerprint.locale,
                    },
                    "timezone": { "zone": fingerprint.timezone },
                },
                "flags": {
                    "audio_masking": "natural",
                    "fonts_masking": "mask",
                    "geolocation_masking": "mask",
                    "localization_masking": "mask",
                    "timezone_masking": "mask",
                },
            },
        });

        if self.proxy.enabled {
            body["parameters"]["proxy"] = json!({
                "type": "http",
                "host": self.proxy.country_host(iso_country),
                "port": self.rotated_port(),
                "username": self.proxy.country_username(iso_country),
                "password": self.proxy.password,
            });
        }
        body
    }
}

#[async_trait]
impl SessionAllocator for MlxAllocator {
    async fn allocate(
        &self,
        iso_country: &str,
        fingerprint: &Fingerprint,
    ) -> Result<SessionHandle> {
        let url = format!("{}/api/v2/profile/quick", self.config.base_url);
        let body = self.quick_profile_body(iso_country, fingerprint);

        let resp: Value = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provisioning(format!("allocator unreachable: {e}")))?
            .json()
            .await
            .map_err(|e| Error::provisioning(format!("allocator returned non-JSON: {e}")))?;

        let http_code = resp
            .pointer("/status/http_code")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if http_code >= 400 {
            let message = resp
                .pointer("/status/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(Error::provisioning(format!(
                "allocator refused profile: {message}"
            )));
        }

        let profile_id = resp
            .pointer("/data/id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::provisioning("allocator response missing profile id"))?
            .to_string();
        let port = resp
            .pointer("/data/port")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::provisioning("allocator response missing driver port"))?;

        let connect_endpoint = Url::parse(&format!("http://127.0.0.1:{port}/"))
            .map_err(|e| Error::provisioning(format!("bad driver endpoint: {e}")))?;

        info!(
            profile_id = %profile_id,
            country = iso_country,
            port,
            "Profile allocated"
        );
        Ok(SessionHandle {
            profile_id,
            connect_endpoint,
        })
    }

    async fn deallocate(&self, handle: &SessionHandle) -> Result<()> {
        let url = format!(
            "{}/api/v1/profile/stop/p/{}",
            self.config.base_url, handle.profile_id
        );
        self.http
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| Error::provisioning(format!("profile stop failed: {e}")))?;
        debug!(profile_id = %handle.profile_id, "Profile stopped");
        Ok(())
    }
}

// ============================================================================
// Provisioner Trait
// ============================================================================

/// Acquires and releases whole sessions.
///
/// Split from [`SessionAllocator`] so the flow can be driven by an
/// in-memory implementation in tests.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Acquires a fresh session routed to a country. Bounded wait.
    async fn acquire(&self, iso_country: &str) -> Result<Session>;

    /// Releases a session. Never raises: release runs inside cleanup paths
    /// that must not mask the original failure.
    async fn release(&self, session: Session);
}

// ============================================================================
// HttpProvisioner
// ============================================================================

/// Production provisioner: allocator plus a WebDriver connection.
pub struct HttpProvisioner {
    allocator: Arc<dyn SessionAllocator>,
    http: reqwest::Client,
    allocator_config: AllocatorConfig,
    timeouts: TimeoutConfig,
}

impl HttpProvisioner {
    #[must_use]
    pub fn new(
        allocator: Arc<dyn SessionAllocator>,
        http: reqwest::Client,
        allocator_config: AllocatorConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            allocator,
            http,
            allocator_config,
            timeouts,
        }
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn acquire(&self, iso_country: &str) -> Result<Session> {
        let fingerprint = Fingerprint::for_route(iso_country, &self.allocator_config);

        let handle = tokio::time::timeout(
            self.timeouts.provisioning(),
            self.allocator.allocate(iso_country, &fingerprint),
        )
        .await
        .map_err(|_| {
            Error::provisioning(format!(
                "allocation exceeded {}ms",
                self.timeouts.provisioning_ms
            ))
        })??;

        // The endpoint is not reliably connectable the instant the
        // allocator reports ready.
        tokio::time::sleep(self.timeouts.provision_settle()).await;

        let driver = RemoteWebDriver::connect(self.http.clone(), handle.connect_endpoint.clone())
            .await
            .map_err(|e| Error::provisioning(format!("driver connect failed: {e}")))?;

        Ok(Session {
            handle,
            fingerprint,
            driver: Arc::new(driver),
        })
    }

    async fn release(&self, session: Session) {
        session.driver.close().await;
        if let Err(e) = self.allocator.deallocate(&session.handle).await {
            warn!(
                profile_id = %session.handle.profile_id,
                error = %e,
                "Profile stop failed during release"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_port_stays_in_range() {
        let allocator = MlxAllocator::new(
            reqwest::Client::new(),
            AllocatorConfig::default(),
            ProxyConfig::default(),
        );
        for _ in 0..100 {
            let port = allocator.rotated_port();
            assert!((40_001..=49_999).contains(&port));
        }
    }

    #[test]
    fn test_rotated_port_tolerates_inverted_range() {
        let proxy = ProxyConfig {
            port_range_start: 49_999,
            port_range_end: 40_001,
            ..ProxyConfig::default()
        };
        let allocator =
            MlxAllocator::new(reqwest::Client::new(), AllocatorConfig::default(), proxy);
        assert_eq!(allocator.rotated_port(), 49_999);
    }

    #[test]
    fn test_quick_profile_body_routes_proxy_by_country() {
        let proxy = ProxyConfig {
            username: "spc123".to_string(),
            password: "secret".to_string(),
            ..ProxyConfig::default()
        };
        let allocator =
            MlxAllocator::new(reqwest::Client::new(), AllocatorConfig::default(), proxy);
        let fingerprint = Fingerprint::for_route("UA", &AllocatorConfig::default());

        let body = allocator.quick_profile_body("UA", &fingerprint);
        assert_eq!(
            body.pointer("/parameters/proxy/host").unwrap(),
            "ua.decodo.com"
        );
        assert_eq!(
            body.pointer("/parameters/proxy/username").unwrap(),
            "user-spc123-country-ua"
        );
        assert_eq!(
            body.pointer("/parameters/fingerprint/timezone/zone").unwrap(),
            "Europe/Kyiv"
        );
    }

    #[test]
    fn test_quick_profile_body_omits_disabled_proxy() {
        let proxy = ProxyConfig {
            enabled: false,
            ..ProxyConfig::default()
        };
        let allocator =
            MlxAllocator::new(reqwest::Client::new(), AllocatorConfig::default(), proxy);
        let fingerprint = Fingerprint::for_route("US", &AllocatorConfig::default());

        let body = allocator.quick_profile_body("US", &fingerprint);
        assert!(body.pointer("/parameters/proxy").is_none());
    }
}
