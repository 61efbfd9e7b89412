//! Thin W3C WebDriver wire-protocol client.
//!
//! The profile allocator hands back a local WebDriver endpoint for each
//! provisioned browser. This wrapper speaks just enough of the W3C protocol
//! to satisfy [`PageDriver`]; it is deliberately not a general-purpose
//! client. Response interception is not expressible over the wire protocol,
//! so [`PageDriver::failed_response`] always reports `None` here and the
//! classifier falls back to page text.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use super::driver::{ElementRef, PageDriver, ResponseRecord};
use super::locator::Locator;

// ============================================================================
// Constants
// ============================================================================

/// W3C element identifier key in wire responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// ============================================================================
// RemoteWebDriver
// ============================================================================

/// [`PageDriver`] implementation over the W3C WebDriver wire protocol.
pub struct RemoteWebDriver {
    http: reqwest::Client,
    base: Url,
    session_id: String,
}

impl RemoteWebDriver {
    /// Opens a WebDriver session against a remote endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if the endpoint refuses a session.
    pub async fn connect(http: reqwest::Client, endpoint: Url) -> Result<Self> {
        let create = endpoint
            .join("session")
            .map_err(|e| Error::driver(format!("bad endpoint: {e}")))?;

        let body = json!({ "capabilities": { "alwaysMatch": {} } });
        let resp: Value = http
            .post(create)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let session_id = resp
            .get("value")
            .and_then(|v| v.get("sessionId"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::driver(format!("no sessionId in response: {resp}")))?
            .to_string();

        debug!(session_id = %session_id, endpoint = %endpoint, "WebDriver session opened");

        Ok(Self {
            http,
            base: endpoint,
            session_id,
        })
    }

    /// Ends the session. Best-effort: errors are reported, not raised.
    pub async fn quit(&self) {
        if let Ok(url) = self.session_url("") {
            if let Err(e) = self.http.delete(url).send().await {
                debug!(session_id = %self.session_id, error = %e, "session delete failed");
            }
        }
    }

    fn session_url(&self, tail: &str) -> Result<Url> {
        let path = if tail.is_empty() {
            format!("session/{}", self.session_id)
        } else {
            format!("session/{}/{tail}", self.session_id)
        };
        self.base
            .join(&path)
            .map_err(|e| Error::driver(format!("bad path {path}: {e}")))
    }

    /// Issues a command and unwraps the W3C `value` envelope.
    async fn command(&self, method: reqwest::Method, tail: &str, body: Option<Value>) -> Result<Value> {
        let url = self.session_url(tail)?;
        let is_post = method == reqwest::Method::POST;
        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        } else if is_post {
            // W3C requires a JSON body on every POST.
            req = req.json(&json!({}));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let payload: Value = resp.json().await?;

        if !status.is_success() {
            let wire_error = payload
                .get("value")
                .and_then(|v| v.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let message = payload
                .get("value")
                .and_then(|v| v.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            return Err(Error::driver(format!("{wire_error}: {message}")));
        }

        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn post(&self, tail: &str, body: Value) -> Result<Value> {
        self.command(reqwest::Method::POST, tail, Some(body)).await
    }

    async fn get(&self, tail: &str) -> Result<Value> {
        self.command(reqwest::Method::GET, tail, None).await
    }

    /// Executes synchronous JavaScript in the page.
    async fn execute(&self, script: &str, args: Value) -> Result<Value> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }
}

// ============================================================================
// PageDriver Implementation
// ============================================================================

#[async_trait]
impl PageDriver for RemoteWebDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(session_id = %self.session_id, url = %url, "Navigating");
        self.post("url", json!({ "url": url }))
            .await
            .map_err(|e| Error::navigation(url, e.to_string()))?;
        Ok(())
    }

    async fn page_url(&self) -> Result<String> {
        let value = self.get("url").await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        let wire = locator.to_wire();
        let result = self
            .post(
                "element",
                json!({ "using": wire.using, "value": wire.value }),
            )
            .await;

        match result {
            Ok(value) => {
                let id = value
                    .get(ELEMENT_KEY)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::driver(format!("malformed element: {value}")))?;
                Ok(Some(ElementRef::new(id)))
            }
            // A miss is a normal answer for candidate chains.
            Err(Error::Driver { message }) if message.starts_with("no such element") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .get(&format!("element/{}/displayed", element.as_str()))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .get(&format!("element/{}/enabled", element.as_str()))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("element/{}/click", element.as_str()), json!({}))
            .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()> {
        self.post(&format!("element/{}/clear", element.as_str()), json!({}))
            .await?;
        self.post(
            &format!("element/{}/value", element.as_str()),
            json!({ "text": value }),
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, value: &str) -> Result<()> {
        // Send keys without clearing; the remote end synthesizes keystrokes.
        self.post(
            &format!("element/{}/value", element.as_str()),
            json!({ "text": value }),
        )
        .await?;
        Ok(())
    }

    async fn select_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        let script = "const el = arguments[0]; el.value = arguments[1]; \
                      el.dispatchEvent(new Event('change', { bubbles: true }));";
        self.execute(
            script,
            json!([{ ELEMENT_KEY: element.as_str() }, value]),
        )
        .await?;
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        let value = self
            .execute("return document.body ? document.body.innerText : '';", json!([]))
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn failed_response(&self, _url_fragment: &str) -> Result<Option<ResponseRecord>> {
        // Not expressible over the wire protocol.
        Ok(None)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.get("screenshot").await?;
        let encoded = value.as_str().unwrap_or("");
        BASE64
            .decode(encoded)
            .map_err(|e| Error::driver(format!("bad screenshot payload: {e}")))
    }

    async fn close(&self) {
        self.quit().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
