//! Browser collaborator over the W3C WebDriver HTTP protocol.
//!
//! Each [`WebDriverContext`] owns one WebDriver session (one browser window),
//! created by [`WebDriverBrowser::new_context`] and deleted by
//! [`BrowsingContext::close`]. Works against chromedriver and any
//! W3C-compliant remote end that accepts `goog:chromeOptions`.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde_json::{json, Value};

use super::{Browser, BrowsingContext};
use crate::error::BrowserError;
use crate::session::{Cookie, SessionState};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Extra HTTP budget on top of the page-load timeout, since a navigate
/// command only answers once the page has loaded.
const COMMAND_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// Page opened before stored cookies are added back. Cookies whose domain
    /// does not cover this origin are skipped.
    pub site_origin: String,
}

/// Opens WebDriver sessions against a remote end such as chromedriver.
#[derive(Debug)]
pub struct WebDriverBrowser {
    client: Client,
    base_url: Url,
    options: WebDriverOptions,
}

impl WebDriverBrowser {
    /// # Errors
    ///
    /// - [`BrowserError::Http`] if the `reqwest::Client` cannot be constructed.
    /// - [`BrowserError::InvalidUrl`] if `webdriver_url` does not parse.
    pub fn new(webdriver_url: &str, options: WebDriverOptions) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(options.navigation_timeout + COMMAND_TIMEOUT_SLACK)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", webdriver_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| BrowserError::InvalidUrl {
            url: webdriver_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            options,
        })
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-agent={}", self.options.user_agent),
            "--disable-gpu".to_owned(),
        ];
        if self.options.headless {
            args.push("--headless=new".to_owned());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "timeouts": { "pageLoad": millis(self.options.navigation_timeout) },
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }

    fn join(&self, path: &str) -> Result<Url, BrowserError> {
        join_url(&self.base_url, path)
    }
}

impl Browser for WebDriverBrowser {
    type Context = WebDriverContext;

    async fn new_context(&self) -> Result<WebDriverContext, BrowserError> {
        let value = send(
            &self.client,
            Method::POST,
            self.join("session")?,
            Some(self.capabilities()),
            "new session",
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                command: "new session".to_owned(),
                reason: "response has no sessionId".to_owned(),
            })?
            .to_owned();

        let context = WebDriverContext {
            client: self.client.clone(),
            commands_url: self.join(&format!("session/{session_id}/"))?,
            session_url: self.join(&format!("session/{session_id}"))?,
            site_origin: self.options.site_origin.clone(),
            session_id,
        };
        tracing::debug!(session_id = %context.session_id, "webdriver session opened");
        Ok(context)
    }
}

/// A live WebDriver session.
#[derive(Debug)]
pub struct WebDriverContext {
    client: Client,
    /// `.../session/{id}/`, base for session commands.
    commands_url: Url,
    /// `.../session/{id}`, target of the delete-session command.
    session_url: Url,
    site_origin: String,
    session_id: String,
}

impl WebDriverContext {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = join_url(&self.commands_url, path)?;
        send(&self.client, method, url, body, path).await
    }

    async fn find_element(&self, selector: &str) -> Result<String, BrowserError> {
        let body = json!({ "using": "css selector", "value": selector });
        match self.command(Method::POST, "element", Some(body)).await {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| BrowserError::Protocol {
                    command: "element".to_owned(),
                    reason: format!("no element reference returned for `{selector}`"),
                }),
            Err(BrowserError::Command { ref error, .. }) if error == "no such element" => {
                Err(BrowserError::NoSuchElement {
                    selector: selector.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

impl BrowsingContext for WebDriverContext {
    async fn restore_session(&self, session: &SessionState) -> Result<(), BrowserError> {
        let cookies = &session.cookies;
        if cookies.is_empty() {
            return Ok(());
        }

        // WebDriver only accepts cookies for the current document's domain.
        self.goto(&self.site_origin).await?;

        let mut restored = 0usize;
        for cookie in cookies {
            let body = json!({ "cookie": to_webdriver_cookie(cookie) });
            match self.command(Method::POST, "cookie", Some(body)).await {
                Ok(_) => restored += 1,
                Err(BrowserError::Command { error, message, .. }) => {
                    tracing::debug!(
                        name = %cookie.name,
                        domain = ?cookie.domain,
                        %error,
                        %message,
                        "cookie not restored"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(
            session_id = %self.session_id,
            restored,
            total = cookies.len(),
            "session cookies restored"
        );
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find_element(selector).await {
                Ok(_) => return Ok(()),
                Err(BrowserError::NoSuchElement { .. }) => {}
                Err(err) => return Err(err),
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(BrowserError::SelectorTimeout {
                    selector: selector.to_owned(),
                    timeout_ms: millis(timeout),
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn enter_frame(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        let body = json!({ "id": { ELEMENT_KEY: element } });
        self.command(Method::POST, "frame", Some(body))
            .await
            .map(|_| ())
    }

    async fn leave_frame(&self) -> Result<(), BrowserError> {
        self.command(Method::POST, "frame", Some(json!({ "id": null })))
            .await
            .map(|_| ())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        self.command(Method::POST, &format!("element/{element}/clear"), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("element/{element}/value"),
            Some(json!({ "text": value })),
        )
        .await
        .map(|_| ())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        self.command(Method::POST, &format!("element/{element}/click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn inner_text(&self, selector: &str) -> Result<String, BrowserError> {
        let element = self.find_element(selector).await?;
        let value = self
            .command(Method::GET, &format!("element/{element}/text"), None)
            .await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| BrowserError::Protocol {
                command: "element text".to_owned(),
                reason: format!("expected a string, got {value}"),
            })
    }

    async fn storage_state(&self) -> Result<SessionState, BrowserError> {
        let value = self.command(Method::GET, "cookie", None).await?;
        let Value::Array(items) = value else {
            return Err(BrowserError::Protocol {
                command: "cookie".to_owned(),
                reason: "expected an array of cookies".to_owned(),
            });
        };
        let cookies = items.iter().filter_map(from_webdriver_cookie).collect();
        Ok(SessionState {
            cookies,
            origins: Vec::new(),
        })
    }

    async fn close(self) -> Result<(), BrowserError> {
        send(
            &self.client,
            Method::DELETE,
            self.session_url.clone(),
            None,
            "delete session",
        )
        .await?;
        tracing::debug!(session_id = %self.session_id, "webdriver session closed");
        Ok(())
    }
}

/// Sends one command and unwraps the `{"value": ...}` envelope.
async fn send(
    client: &Client,
    method: Method,
    url: Url,
    body: Option<Value>,
    command: &str,
) -> Result<Value, BrowserError> {
    tracing::debug!(%method, %url, command, "webdriver command");

    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let mut envelope: Value = serde_json::from_str(&text).map_err(|e| BrowserError::Protocol {
        command: command.to_owned(),
        reason: format!("HTTP {status} with non-JSON body: {e}"),
    })?;
    let value = envelope.get_mut("value").map_or(Value::Null, Value::take);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_owned();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        return Err(BrowserError::Command {
            command: command.to_owned(),
            error,
            message,
        });
    }

    Ok(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_webdriver_cookie(cookie: &Cookie) -> Value {
    let mut value = json!({
        "name": cookie.name,
        "value": cookie.value,
        "secure": cookie.secure,
        "httpOnly": cookie.http_only,
    });
    if let Some(domain) = &cookie.domain {
        value["domain"] = json!(domain);
    }
    if let Some(path) = &cookie.path {
        value["path"] = json!(path);
    }
    if cookie.expires >= 0.0 {
        value["expiry"] = json!(cookie.expires as u64);
    }
    if let Some(same_site) = &cookie.same_site {
        value["sameSite"] = json!(same_site);
    }
    value
}

#[allow(clippy::cast_precision_loss)]
fn from_webdriver_cookie(value: &Value) -> Option<Cookie> {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
    let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
    Some(Cookie {
        name: text("name")?,
        value: text("value")?,
        domain: text("domain"),
        path: text("path"),
        expires: value
            .get("expiry")
            .and_then(Value::as_u64)
            .map_or(-1.0, |secs| secs as f64),
        http_only: flag("httpOnly"),
        secure: flag("secure"),
        same_site: text("sameSite"),
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, BrowserError> {
    base.join(path).map_err(|e| BrowserError::InvalidUrl {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
