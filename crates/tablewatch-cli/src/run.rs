//! One polling run: plan, authenticate, fetch, report.

use std::time::Duration;

use anyhow::Context;
use tablewatch_core::{load_catalog, AppConfig, Catalog, MealPeriod};
use tablewatch_scraper::{
    aggregate, Authenticator, FetchOrchestrator, QueryBuilder, SessionStore, WebDriverBrowser,
    WebDriverOptions,
};

use crate::{report, Cli};

/// Runs the whole pipeline and prints the report to stdout.
///
/// # Errors
///
/// Fails before any browser work on invalid arguments or configuration, on
/// login failure, and when every query failed. Individual query failures are
/// reported per venue instead.
pub(crate) async fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let catalog = match &config.catalog_path {
        Some(path) => load_catalog(path)
            .with_context(|| format!("failed to load venue catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };

    let plan = QueryBuilder::new(&catalog, &config.api_base)?.build(
        cli.guests,
        cli.date,
        cli.extra_days,
        &MealPeriod::ALL,
    )?;
    println!(
        "{}",
        report::headline(cli.guests, plan.start_date(), plan.end_date())
    );

    let store = SessionStore::new(&config.session_path);
    if cli.reset_session && store.clear()? {
        println!("Removed stored session {}", store.path().display());
    }

    let browser = WebDriverBrowser::new(
        &config.webdriver_url,
        WebDriverOptions {
            headless: cli.headless,
            user_agent: config.user_agent.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            site_origin: config.site_origin.clone(),
        },
    )
    .context("failed to build WebDriver client")?;

    let auth = Authenticator::new(
        &browser,
        catalog.login_page(),
        Duration::from_secs(config.login_timeout_secs),
    );
    let session = store
        .load_or_login(|| async {
            let credentials = config.credentials()?;
            println!("Logging in...");
            auth.login(&credentials).await
        })
        .await
        .context("could not establish a session")?;

    println!("Fetching schedule data...");
    let results = FetchOrchestrator::new(&browser, Duration::from_secs(config.venue_timeout_secs))
        .fetch(&plan, &session)
        .await;
    let availability = aggregate(&catalog, &results);

    let color = colored::control::SHOULD_COLORIZE.should_colorize();
    print!("{}", report::render(&availability, color));

    if results.all_failed() {
        anyhow::bail!(
            "all {} queries failed; the stored session at {} may be stale. \
             Delete it or rerun with --reset-session to log in again",
            results.total_failures(),
            store.path().display()
        );
    }
    if results.total_failures() > 0 {
        tracing::warn!(
            failed = results.total_failures(),
            succeeded = results.total_responses(),
            "some queries failed"
        );
    }
    Ok(())
}
