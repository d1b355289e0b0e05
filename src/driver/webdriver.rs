//! W3C WebDriver backend
//!
//! Drives chromedriver, geckodriver, msedgedriver or safaridriver over the
//! WebDriver HTTP protocol.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::*;
use crate::session::BrowserKind;
use crate::Error;

/// W3C web element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Error returned by the remote end
#[derive(Debug, Clone)]
struct WireFailure {
    error: String,
    message: String,
}

impl WireFailure {
    fn into_error(self) -> Error {
        let detail = format!("{}: {}", self.error, self.message);
        if self.error == "stale element reference" {
            Error::stale_element(detail)
        } else {
            Error::driver(detail)
        }
    }
}

/// Shared HTTP transport to a WebDriver server
#[derive(Debug, Clone)]
struct Transport {
    endpoint: String,
    http: reqwest::Client,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    /// Send a command, keeping remote failures separate from transport failures
    async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<std::result::Result<Value, WireFailure>, Error> {
        let url = self.url(path);
        debug!("WebDriver {} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return Ok(Err(WireFailure {
                error: error.to_string(),
                message: value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("")
                    .to_string(),
            }));
        }

        if !status.is_success() {
            return Ok(Err(WireFailure {
                error: format!("http {}", status.as_u16()),
                message: payload.to_string(),
            }));
        }

        Ok(Ok(value))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, Error> {
        self.send_raw(method, path, body)
            .await?
            .map_err(WireFailure::into_error)
    }
}

/// WebDriver browser implementation
#[derive(Debug)]
pub struct WebDriverBrowser {
    transport: Transport,
    headless: bool,
}

impl WebDriverBrowser {
    /// Create a new WebDriver browser factory
    ///
    /// # Arguments
    /// * `endpoint` - WebDriver server URL (e.g., "http://localhost:4444")
    pub fn new<S: Into<String>>(endpoint: S, headless: bool) -> Result<Self, Error> {
        let endpoint = endpoint.into();
        info!("Creating WebDriver browser factory for endpoint: {}", endpoint);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            transport: Transport { endpoint, http },
            headless,
        })
    }

    /// Build the `alwaysMatch` capabilities for a browser kind
    fn capabilities(&self, kind: BrowserKind) -> Value {
        let mut caps = json!({ "browserName": kind.webdriver_name() });

        if self.headless {
            match kind {
                BrowserKind::Chrome => {
                    caps["goog:chromeOptions"] = json!({ "args": ["--headless=new"] });
                }
                BrowserKind::Edge => {
                    caps["ms:edgeOptions"] = json!({ "args": ["--headless=new"] });
                }
                BrowserKind::Firefox => {
                    caps["moz:firefoxOptions"] = json!({ "args": ["-headless"] });
                }
                // safaridriver has no headless mode
                BrowserKind::Safari => {}
            }
        }

        caps
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn create_session(&self, kind: BrowserKind) -> Result<Arc<dyn DriverHandle>, Error> {
        let body = json!({
            "capabilities": { "alwaysMatch": self.capabilities(kind) }
        });

        let value = self.transport.send(Method::POST, "/session", Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::driver("New session response carried no sessionId"))?
            .to_string();

        info!("Created {} WebDriver session {}", kind, session_id);

        Ok(Arc::new(WebDriverSession {
            transport: self.transport.clone(),
            session_id,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Escape a value for a double-quoted CSS string
fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            '\r' => out.push_str("\\d "),
            '\0' => out.push('\u{FFFD}'),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value as a CSS identifier (class names)
fn css_identifier(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading_digit = c.is_ascii_digit()
            && (i == 0 || (i == 1 && value.starts_with('-')));
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if c.is_control() || leading_digit {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// One WebDriver session
#[derive(Debug)]
pub struct WebDriverSession {
    transport: Transport,
    session_id: String,
    closed: AtomicBool,
}

impl WebDriverSession {
    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    fn element_path(&self, element: &ElementHandle, suffix: &str) -> String {
        self.path(&format!("/element/{}{}", element.id, suffix))
    }

    /// Map a locator onto a WebDriver location strategy
    fn strategy(locator: &Locator) -> (&'static str, String) {
        match locator {
            Locator::Id(v) => ("css selector", format!("[id=\"{}\"]", css_string(v))),
            Locator::ClassName(v) => ("css selector", format!(".{}", css_identifier(v))),
            Locator::Name(v) => ("css selector", format!("*[name=\"{}\"]", css_string(v))),
            Locator::Css(v) => ("css selector", v.clone()),
            Locator::XPath(v) => ("xpath", v.clone()),
            Locator::LinkText(v) => ("link text", v.clone()),
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::driver(format!("Session {} is closed", self.session_id)));
        }
        Ok(())
    }

    async fn get_bool(&self, path: String) -> Result<bool, Error> {
        self.ensure_open()?;
        let value = self.transport.send(Method::GET, &path, None).await?;
        value
            .as_bool()
            .ok_or_else(|| Error::driver(format!("Expected boolean from {}", path)))
    }

    async fn get_string(&self, path: String) -> Result<String, Error> {
        self.ensure_open()?;
        let value = self.transport.send(Method::GET, &path, None).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::driver(format!("Expected string from {}", path)))
    }
}

#[async_trait]
impl DriverHandle for WebDriverSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .send(Method::POST, &self.path("/url"), Some(json!({ "url": url })))
            .await
            .map_err(|e| Error::navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        self.get_string(self.path("/url")).await
    }

    async fn title(&self) -> Result<String, Error> {
        self.get_string(self.path("/title")).await
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, Error> {
        self.ensure_open()?;
        let (using, value) = Self::strategy(locator);

        let result = self
            .transport
            .send_raw(
                Method::POST,
                &self.path("/element"),
                Some(json!({ "using": using, "value": value })),
            )
            .await?;

        match result {
            Ok(value) => {
                let id = value
                    .get(ELEMENT_KEY)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::driver("Find element response carried no element reference"))?;
                Ok(Some(ElementHandle {
                    id: id.to_string(),
                    locator: locator.clone(),
                }))
            }
            Err(failure) if failure.error == "no such element" => Ok(None),
            Err(failure) => Err(failure.into_error()),
        }
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, Error> {
        self.get_bool(self.element_path(element, "/displayed")).await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, Error> {
        self.get_bool(self.element_path(element, "/enabled")).await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .send(Method::POST, &self.element_path(element, "/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .send(
                Method::POST,
                &self.element_path(element, "/value"),
                Some(json!({ "text": text })),
            )
            .await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value, Error> {
        self.ensure_open()?;
        self.transport
            .send(
                Method::POST,
                &self.path("/execute/sync"),
                Some(json!({ "script": script, "args": [] })),
            )
            .await
    }

    async fn screenshot(&self) -> Result<Bytes, Error> {
        let encoded = self
            .get_string(self.path("/screenshot"))
            .await
            .map_err(|e| Error::screenshot(e.to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(|e| Error::screenshot(format!("Invalid screenshot encoding: {}", e)))
    }

    async fn maximize_window(&self) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .send(Method::POST, &self.path("/window/maximize"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .send(
                Method::POST,
                &self.path("/window/rect"),
                Some(json!({ "width": width, "height": height })),
            )
            .await?;
        Ok(())
    }

    async fn window_rect(&self) -> Result<WindowRect, Error> {
        self.ensure_open()?;
        let value = self
            .transport
            .send(Method::GET, &self.path("/window/rect"), None)
            .await?;

        let field = |name: &str| value.get(name).and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(WindowRect {
            x: field("x"),
            y: field("y"),
            width: field("width").max(0) as u32,
            height: field("height").max(0) as u32,
        })
    }

    async fn quit(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        self.transport.send(Method::DELETE, &self.path(""), None).await?;
        info!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }
}
