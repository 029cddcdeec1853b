//! End-to-end tests of login, fetch, and aggregation against an in-memory
//! browser.
//!
//! The fake serves a canned body per URL through a responder function, and
//! counts contexts opened and closed so resource release can be asserted.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tablewatch_core::{Catalog, ConfigError, Credentials, MealPeriod, Venue};
use tablewatch_scraper::auth::SIGNED_IN_SELECTOR;
use tablewatch_scraper::{
    aggregate, Authenticator, Browser, BrowserError, BrowsingContext, Cookie, FetchOrchestrator,
    QueryBuilder, SessionState, SessionStore, TablewatchError, VenueStatus,
};

const API_BASE: &str = "https://api.test/wdw";
const DINNER: &str = "mealPeriod=80000714";
const LUNCH: &str = "mealPeriod=80000717";

// ---------------------------------------------------------------------------
// Fake browser
// ---------------------------------------------------------------------------

struct Shared {
    respond: fn(&str) -> String,
    slow_urls: Vec<&'static str>,
    missing_selectors: HashSet<&'static str>,
    fail_new_context: bool,
    goto_delay: Option<Duration>,
    opened: Cell<usize>,
    closed: Cell<usize>,
    restored_cookies: RefCell<Vec<usize>>,
    actions: RefCell<Vec<String>>,
}

struct FakeBrowser {
    shared: Rc<Shared>,
}

impl FakeBrowser {
    fn new(respond: fn(&str) -> String) -> Self {
        Self::with(respond, |_| {})
    }

    fn with(respond: fn(&str) -> String, configure: impl FnOnce(&mut Shared)) -> Self {
        let mut shared = Shared {
            respond,
            slow_urls: Vec::new(),
            missing_selectors: HashSet::new(),
            fail_new_context: false,
            goto_delay: None,
            opened: Cell::new(0),
            closed: Cell::new(0),
            restored_cookies: RefCell::new(Vec::new()),
            actions: RefCell::new(Vec::new()),
        };
        configure(&mut shared);
        Self {
            shared: Rc::new(shared),
        }
    }

    fn opened(&self) -> usize {
        self.shared.opened.get()
    }

    fn closed(&self) -> usize {
        self.shared.closed.get()
    }
}

struct FakeContext {
    shared: Rc<Shared>,
    current_url: RefCell<String>,
}

impl Browser for FakeBrowser {
    type Context = FakeContext;

    async fn new_context(&self) -> Result<FakeContext, BrowserError> {
        if self.shared.fail_new_context {
            return Err(BrowserError::Command {
                command: "new session".to_owned(),
                error: "session not created".to_owned(),
                message: "no chrome binary".to_owned(),
            });
        }
        self.shared.opened.set(self.shared.opened.get() + 1);
        self.shared.actions.borrow_mut().push("open".to_owned());
        Ok(FakeContext {
            shared: Rc::clone(&self.shared),
            current_url: RefCell::new(String::new()),
        })
    }
}

impl FakeContext {
    fn record(&self, action: String) {
        self.shared.actions.borrow_mut().push(action);
    }
}

impl BrowsingContext for FakeContext {
    async fn restore_session(&self, session: &SessionState) -> Result<(), BrowserError> {
        self.shared
            .restored_cookies
            .borrow_mut()
            .push(session.cookies.len());
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("goto {url}"));
        if self.shared.slow_urls.iter().any(|s| url.contains(s)) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        } else if let Some(delay) = self.shared.goto_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        *self.current_url.borrow_mut() = url.to_owned();
        self.record(format!("loaded {url}"));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.record(format!("wait {selector}"));
        if self.shared.missing_selectors.contains(selector) {
            return Err(BrowserError::SelectorTimeout {
                selector: selector.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            });
        }
        Ok(())
    }

    async fn enter_frame(&self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("enter {selector}"));
        Ok(())
    }

    async fn leave_frame(&self) -> Result<(), BrowserError> {
        self.record("leave".to_owned());
        Ok(())
    }

    async fn fill(&self, selector: &str, _value: &str) -> Result<(), BrowserError> {
        self.record(format!("fill {selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn inner_text(&self, _selector: &str) -> Result<String, BrowserError> {
        tokio::task::yield_now().await;
        Ok((self.shared.respond)(&self.current_url.borrow()))
    }

    async fn storage_state(&self) -> Result<SessionState, BrowserError> {
        Ok(SessionState {
            cookies: vec![Cookie {
                name: "SWID".to_owned(),
                value: "{FRESH}".to_owned(),
                domain: Some(".go.com".to_owned()),
                path: Some("/".to_owned()),
                expires: -1.0,
                http_only: false,
                secure: true,
                same_site: None,
            }],
            origins: vec![],
        })
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.shared.closed.set(self.shared.closed.get() + 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn catalog() -> Catalog {
    Catalog::new(vec![
        Venue::new("alpha", "111", "https://example.com/alpha"),
        Venue::new("beta", "222", "https://example.com/beta"),
    ])
    .unwrap()
}

fn session() -> SessionState {
    SessionState {
        cookies: vec![Cookie {
            name: "SWID".to_owned(),
            value: "{STORED}".to_owned(),
            domain: Some(".go.com".to_owned()),
            path: Some("/".to_owned()),
            expires: -1.0,
            http_only: false,
            secure: true,
            same_site: None,
        }],
        origins: vec![],
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "guest@example.com".to_owned(),
        password: "hunter2".to_owned(),
    }
}

/// Alpha dinner has two slots on 2023-07-01, everything else is empty.
fn alpha_dinner_open(url: &str) -> String {
    if url.contains("/111;") && url.contains(DINNER) && url.contains("/2023-07-01/") {
        r#"{"offers": [
            {"dateTime": "2023-07-01T18:00:00-04:00", "time": "6:00 PM"},
            {"dateTime": "2023-07-01T19:00:00-04:00", "time": "7:00 PM"}
        ]}"#
        .to_owned()
    } else {
        r#"{"restaurant": {}}"#.to_owned()
    }
}

/// Alpha dinner serves an HTML error page; beta lunch has one slot.
fn alpha_dinner_broken(url: &str) -> String {
    if url.contains("/111;") && url.contains(DINNER) {
        "<html><body>Access Denied</body></html>".to_owned()
    } else if url.contains("/111;") && url.contains(LUNCH) {
        r#"{"offers": [{"dateTime": "2023-07-01T11:30", "time": "11:30 AM"}]}"#.to_owned()
    } else if url.contains("/222;") && url.contains(LUNCH) {
        r#"{"offers": [{"dateTime": "2023-07-01T12:00", "time": "12:00 PM"}]}"#.to_owned()
    } else {
        r#"{"offers": []}"#.to_owned()
    }
}

fn all_html(_url: &str) -> String {
    "<html>Please sign in</html>".to_owned()
}

// ---------------------------------------------------------------------------
// Fetch and aggregate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reports_offers_in_order_and_marks_empty_venues() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 0, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::new(alpha_dinner_open);

    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;
    let report = aggregate(&catalog, &results);

    assert_eq!(
        report.get("alpha").unwrap().status,
        VenueStatus::Available(vec![
            "Jul 01 @ 6:00 PM".to_owned(),
            "Jul 01 @ 7:00 PM".to_owned()
        ])
    );
    assert_eq!(report.get("beta").unwrap().status, VenueStatus::NoAvailability);
    assert_eq!(results.total_responses(), 4);
    assert_eq!(results.total_failures(), 0);
}

#[tokio::test]
async fn one_venue_context_per_venue_with_session_restored_and_released() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(2, d("2023-07-01"), 2, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::new(alpha_dinner_open);

    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;

    assert_eq!(browser.opened(), 2);
    assert_eq!(browser.closed(), 2);
    assert_eq!(*browser.shared.restored_cookies.borrow(), vec![1, 1]);
    assert_eq!(results.get("alpha").unwrap().attempted(), 6);
    assert_eq!(results.get("beta").unwrap().attempted(), 6);
}

#[tokio::test]
async fn queries_within_a_venue_run_in_plan_order() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 1, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::new(alpha_dinner_open);

    FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;

    let visited: Vec<String> = browser
        .shared
        .actions
        .borrow()
        .iter()
        .filter_map(|a| a.strip_prefix("goto "))
        .filter(|url| url.contains("/111;"))
        .map(str::to_owned)
        .collect();
    let expected: Vec<String> = plan.groups()[0]
        .targets
        .iter()
        .map(|t| t.resolved_url.clone())
        .collect();
    assert_eq!(visited, expected);
}

#[tokio::test]
async fn malformed_response_is_isolated_to_its_query() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 0, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::new(alpha_dinner_broken);

    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;

    let alpha = results.get("alpha").unwrap();
    assert_eq!(alpha.responses.len(), 1);
    assert_eq!(alpha.failures.len(), 1);
    let failure = &alpha.failures[0];
    assert_eq!(failure.meal, MealPeriod::Dinner);
    assert_eq!(failure.date, d("2023-07-01"));
    assert!(matches!(failure.error, TablewatchError::FetchParse { .. }));

    let report = aggregate(&catalog, &results);
    let alpha = report.get("alpha").unwrap();
    assert_eq!(
        alpha.status,
        VenueStatus::Available(vec!["Jul 01 @ 11:30 AM".to_owned()])
    );
    assert_eq!(alpha.failed_queries, 1);
    assert_eq!(
        report.get("beta").unwrap().status,
        VenueStatus::Available(vec!["Jul 01 @ 12:00 PM".to_owned()])
    );
    assert!(!results.all_failed());
}

#[tokio::test]
async fn stale_session_fails_every_query_without_aborting() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 0, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::new(all_html);

    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;

    assert!(results.all_failed());
    assert_eq!(results.total_failures(), 4);
    let report = aggregate(&catalog, &results);
    assert!(report
        .venues()
        .iter()
        .all(|v| v.status == VenueStatus::Unknown));
}

#[tokio::test]
async fn venue_deadline_fails_remaining_queries_and_still_closes() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 1, &MealPeriod::ALL)
        .unwrap();
    let browser = FakeBrowser::with(alpha_dinner_open, |s| {
        s.slow_urls.push("/222;");
    });

    let results = FetchOrchestrator::new(&browser, Duration::from_millis(200))
        .fetch(&plan, &session())
        .await;

    let beta = results.get("beta").unwrap();
    assert!(beta.responses.is_empty());
    assert_eq!(beta.failures.len(), 4);
    assert!(beta
        .failures
        .iter()
        .all(|f| matches!(f.error, TablewatchError::VenueTimeout { .. })));
    assert_eq!(results.get("alpha").unwrap().responses.len(), 4);
    assert_eq!(browser.closed(), 2);
}

#[tokio::test]
async fn venues_are_fetched_concurrently() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 0, &[MealPeriod::Dinner])
        .unwrap();
    let browser = FakeBrowser::with(alpha_dinner_open, |s| {
        s.goto_delay = Some(Duration::from_millis(300));
    });

    let started = Instant::now();
    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.total_responses(), 2);
    let actions = browser.shared.actions.borrow();
    let last_open = actions.iter().rposition(|a| a == "open").unwrap();
    let first_loaded = actions
        .iter()
        .position(|a| a.starts_with("loaded "))
        .unwrap();
    assert!(
        last_open < first_loaded,
        "every venue context should open before any page finishes loading: {actions:?}"
    );
    assert!(
        elapsed < Duration::from_millis(550),
        "two 300 ms venues took {elapsed:?}"
    );
}

#[tokio::test]
async fn unopenable_context_fails_that_venues_queries() {
    let catalog = catalog();
    let plan = QueryBuilder::new(&catalog, API_BASE)
        .unwrap()
        .build(4, d("2023-07-01"), 0, &[MealPeriod::Dinner])
        .unwrap();
    let browser = FakeBrowser::with(alpha_dinner_open, |s| s.fail_new_context = true);

    let results = FetchOrchestrator::new(&browser, Duration::from_secs(10))
        .fetch(&plan, &session())
        .await;

    assert!(results.all_failed());
    assert!(results
        .iter()
        .flat_map(|(_, v)| v.failures.iter())
        .all(|f| matches!(f.error, TablewatchError::ContextUnavailable { .. })));
    let report = aggregate(&catalog, &results);
    assert_eq!(report.get("alpha").unwrap().status, VenueStatus::Unknown);
}

// ---------------------------------------------------------------------------
// Login and session reuse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_fills_form_inside_frame_and_captures_session() {
    let browser = FakeBrowser::new(all_html);
    let auth = Authenticator::new(&browser, "https://example.com/login", Duration::from_secs(5));

    let state = auth.login(&credentials()).await.unwrap();

    assert_eq!(state.cookies[0].value, "{FRESH}");
    assert_eq!(browser.opened(), 1);
    assert_eq!(browser.closed(), 1);
    assert!(browser.shared.restored_cookies.borrow().is_empty());
    assert_eq!(
        *browser.shared.actions.borrow(),
        vec![
            "open",
            "goto https://example.com/login",
            "loaded https://example.com/login",
            "wait iframe",
            "enter iframe",
            "wait input[type=email]",
            "fill input[type=email]",
            "fill input[type=password]",
            "click button[type=submit]",
            "leave",
            "wait #search-time-button button",
        ]
    );
}

#[tokio::test]
async fn login_without_signed_in_marker_fails_and_closes_context() {
    let browser = FakeBrowser::with(all_html, |s| {
        s.missing_selectors.insert(SIGNED_IN_SELECTOR);
    });
    let auth = Authenticator::new(&browser, "https://example.com/login", Duration::from_secs(5));

    let err = auth.login(&credentials()).await.unwrap_err();

    match err {
        TablewatchError::LoginFailed { reason } => {
            assert!(reason.starts_with("confirm signed in"), "reason: {reason}");
        }
        other => panic!("expected LoginFailed, got: {other:?}"),
    }
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn stored_session_is_reused_without_login() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("cookies"));
    store.save(&session()).unwrap();

    let browser = FakeBrowser::new(all_html);
    let auth = Authenticator::new(&browser, "https://example.com/login", Duration::from_secs(5));
    let creds = credentials();

    let state = store.load_or_login(|| auth.login(&creds)).await.unwrap();

    assert_eq!(state, session());
    assert_eq!(browser.opened(), 0, "authenticator must not run");
}

#[tokio::test]
async fn missing_session_logs_in_once_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("cookies"));

    let browser = FakeBrowser::new(all_html);
    let auth = Authenticator::new(&browser, "https://example.com/login", Duration::from_secs(5));
    let creds = credentials();

    let first = store.load_or_login(|| auth.login(&creds)).await.unwrap();
    let second = store.load_or_login(|| auth.login(&creds)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(browser.opened(), 1);
    assert!(store.has_session());
}

#[tokio::test]
async fn credentials_are_resolved_only_when_login_is_needed() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("cookies"));
    let browser = FakeBrowser::new(all_html);
    let auth = Authenticator::new(&browser, "https://example.com/login", Duration::from_secs(5));
    let unset = || -> Result<Credentials, ConfigError> {
        Err(ConfigError::MissingEnvVar("DISNEY_USERNAME".to_owned()))
    };

    let err = store
        .load_or_login(|| async {
            let creds = unset()?;
            auth.login(&creds).await
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, TablewatchError::Credentials(ConfigError::MissingEnvVar(_))),
        "got: {err:?}"
    );
    assert_eq!(browser.opened(), 0);
    assert!(!store.has_session());

    store.save(&session()).unwrap();
    let state = store
        .load_or_login(|| async {
            let creds = unset()?;
            auth.login(&creds).await
        })
        .await
        .unwrap();
    assert_eq!(state, session());
    assert_eq!(browser.opened(), 0);
}
