//! Minimal W3C WebDriver client
//!
//! Only the commands the portal workflow needs, behind the [`Browser`]
//! trait: navigation, cookies, element lookup by CSS selector, typing,
//! clearing, clicking and reading text. Every response is a `{"value": ...}` envelope; failures
//! carry `{"value": {"error": ..., "message": ...}}` with a non-2xx status.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use revox_core::SessionError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Key of the element reference in W3C responses
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver errors
#[derive(Debug, thiserror::Error)]
pub enum WebDriverError {
    /// Request could not be sent or read
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Driver reported a command error
    #[error("{error}: {message}")]
    Command {
        /// W3C error code, e.g. `no such element`
        error: String,
        /// Driver message
        message: String,
    },

    /// Response did not match the protocol
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Driver process could not be started
    #[error("cannot start driver: {0}")]
    Spawn(#[from] std::io::Error),

    /// Driver never reported ready
    #[error("driver at {0} not ready")]
    NotReady(String),
}

impl WebDriverError {
    /// Whether the driver reported a missing element
    #[must_use]
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, Self::Command { error, .. } if error == "no such element")
    }
}

impl From<WebDriverError> for SessionError {
    fn from(err: WebDriverError) -> Self {
        if err.is_no_such_element() {
            return match err {
                WebDriverError::Command { message, .. } => SessionError::ElementNotFound(message),
                other => SessionError::ElementNotFound(other.to_string()),
            };
        }
        match err {
            WebDriverError::Http(e) => SessionError::Transport(e.to_string()),
            WebDriverError::Spawn(e) => SessionError::Transport(e.to_string()),
            e @ WebDriverError::NotReady(_) => SessionError::Transport(e.to_string()),
            e @ (WebDriverError::Command { .. } | WebDriverError::Malformed(_)) => {
                SessionError::Command(e.to_string())
            }
        }
    }
}

/// Handle of an element found on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    /// Wrap a driver-assigned element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Driver-assigned element id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

/// Decode a WebDriver response body
///
/// # Errors
/// `Command` for error envelopes, `Malformed` for anything unreadable.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, WebDriverError> {
    if !status.is_success() {
        return match serde_json::from_slice::<Envelope<WireError>>(body) {
            Ok(Envelope { value }) => Err(WebDriverError::Command {
                error: value.error,
                message: value.message,
            }),
            Err(_) => Err(WebDriverError::Malformed(format!(
                "status {status} with body {}",
                String::from_utf8_lossy(body)
            ))),
        };
    }

    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.value)
        .map_err(|e| WebDriverError::Malformed(e.to_string()))
}

/// Firefox capabilities: private browsing, quiet driver log, optional headless
#[must_use]
pub fn firefox_capabilities(headless: bool) -> Value {
    let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "firefox",
                "moz:firefoxOptions": {
                    "args": args,
                    "prefs": { "browser.privatebrowsing.autostart": true },
                    "log": { "level": "fatal" }
                }
            }
        }
    })
}

/// Connected WebDriver session
#[derive(Debug)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    closed: bool,
}

impl WebDriverClient {
    /// Open a new browser session
    ///
    /// # Errors
    /// Driver unreachable or session refused.
    pub async fn connect(base_url: &str, capabilities: Value) -> Result<Self, WebDriverError> {
        let http = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = http
            .post(format!("{base_url}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        let session: NewSession = decode(status, &body)?;

        tracing::debug!(session_id = %session.session_id, "WebDriver session opened");
        Ok(Self {
            http,
            base_url,
            session_id: session.session_id,
            closed: false,
        })
    }

    /// Session id assigned by the driver
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, WebDriverError> {
        let url = format!("{}/session/{}{path}", self.base_url, self.session_id);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode(status, &bytes)
    }

    /// Set how long element lookups wait for the element to appear
    ///
    /// # Errors
    /// Driver command failure.
    pub async fn set_implicit_wait(&self, wait: Duration) -> Result<(), WebDriverError> {
        let millis = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self.command(Method::POST, "/timeouts", Some(json!({ "implicit": millis })))
            .await
    }
}

/// Browser commands the portal workflow issues
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate to `url`
    async fn navigate(&self, url: &str) -> Result<(), WebDriverError>;

    /// Current page URL
    async fn current_url(&self) -> Result<String, WebDriverError>;

    /// Current page title
    async fn title(&self) -> Result<String, WebDriverError>;

    /// Find an element by CSS selector; `no such element` once the
    /// implicit wait expires
    async fn find(&self, selector: &str) -> Result<ElementRef, WebDriverError>;

    /// Type into an element
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError>;

    /// Empty an editable element
    async fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError>;

    /// Click an element
    async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError>;

    /// Visible text of an element
    async fn text(&self, element: &ElementRef) -> Result<String, WebDriverError>;

    /// Whether an element is rendered visibly
    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError>;

    /// Drop every cookie of the current document's domain
    async fn delete_cookies(&self) -> Result<(), WebDriverError>;

    /// End the browser session; later calls are no-ops
    async fn close(&mut self) -> Result<(), WebDriverError>;

    /// Find an element, `None` when it is absent
    async fn find_optional(&self, selector: &str) -> Result<Option<ElementRef>, WebDriverError> {
        match self.find(selector).await {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Browser for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
    }

    async fn current_url(&self) -> Result<String, WebDriverError> {
        self.command(Method::GET, "/url", None).await
    }

    async fn title(&self) -> Result<String, WebDriverError> {
        self.command(Method::GET, "/title", None).await
    }

    async fn find(&self, selector: &str) -> Result<ElementRef, WebDriverError> {
        let value: Value = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;

        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(ElementRef::new)
            .ok_or_else(|| WebDriverError::Malformed(format!("no element reference in {value}")))
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await
    }

    async fn text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        self.command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.command(
            Method::GET,
            &format!("/element/{}/displayed", element.id()),
            None,
        )
        .await
    }

    async fn delete_cookies(&self) -> Result<(), WebDriverError> {
        self.command(Method::DELETE, "/cookie", None).await
    }

    async fn close(&mut self) -> Result<(), WebDriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.command::<Value>(Method::DELETE, "", None).await?;
        tracing::debug!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_value_envelope() {
        let title: String = decode(StatusCode::OK, br#"{"value":"Unity ID"}"#).unwrap();
        assert_eq!(title, "Unity ID");

        decode::<()>(StatusCode::OK, br#"{"value":null}"#).unwrap();
    }

    #[test]
    fn decode_new_session() {
        let body = br#"{"value":{"sessionId":"4d1f","capabilities":{"browserName":"firefox"}}}"#;
        let session: NewSession = decode(StatusCode::OK, body).unwrap();
        assert_eq!(session.session_id, "4d1f");
    }

    #[test]
    fn decode_missing_element() {
        let body = br#"{"value":{"error":"no such element","message":"Unable to locate element: div.error-msg","stacktrace":""}}"#;
        let err = decode::<Value>(StatusCode::NOT_FOUND, body).unwrap_err();

        assert!(err.is_no_such_element());
        assert!(matches!(
            SessionError::from(err),
            SessionError::ElementNotFound(msg) if msg.contains("div.error-msg")
        ));
    }

    #[test]
    fn decode_other_command_error() {
        let body = br#"{"value":{"error":"invalid session id","message":"gone"}}"#;
        let err = decode::<Value>(StatusCode::NOT_FOUND, body).unwrap_err();

        assert!(!err.is_no_such_element());
        assert!(matches!(SessionError::from(err), SessionError::Command(_)));
    }

    #[test]
    fn decode_garbage_is_malformed() {
        let err = decode::<Value>(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert!(matches!(err, WebDriverError::Malformed(_)));

        let err = decode::<String>(StatusCode::OK, br#"{"value":42}"#).unwrap_err();
        assert!(matches!(err, WebDriverError::Malformed(_)));
    }

    #[test]
    fn capabilities_request_private_headless_firefox() {
        let caps = firefox_capabilities(true);
        let options = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"];

        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "firefox");
        assert_eq!(options["args"], json!(["-headless"]));
        assert_eq!(options["prefs"]["browser.privatebrowsing.autostart"], true);

        let windowed = firefox_capabilities(false);
        assert_eq!(
            windowed["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"],
            json!([])
        );
    }
}
