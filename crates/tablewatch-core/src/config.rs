use crate::app_config::AppConfig;
use crate::ConfigError;

pub const DEFAULT_API_BASE: &str =
    "https://disneyworld.disney.go.com/finder/api/v1/explorer-service/dining-availability/x/wdw";

pub const DEFAULT_SITE_ORIGIN: &str = "https://disneyworld.disney.go.com/";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:89.0) Gecko/20100101 Firefox/89.0";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_secs = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if secs == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(secs)
    };

    let parse_url = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(raw)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("'{raw}' is not an http(s) URL"),
            })
        }
    };

    let username = optional("DISNEY_USERNAME");
    let password = optional("DISNEY_PASSWORD");

    let log_level = or_default("TABLEWATCH_LOG_LEVEL", "warn");
    let session_path = PathBuf::from(or_default("TABLEWATCH_SESSION_PATH", "./cookies"));
    let catalog_path = optional("TABLEWATCH_CATALOG_PATH").map(PathBuf::from);

    let webdriver_url = parse_url("TABLEWATCH_WEBDRIVER_URL", "http://localhost:9515")?;
    let api_base = parse_url("TABLEWATCH_API_BASE", DEFAULT_API_BASE)?;
    let site_origin = parse_url("TABLEWATCH_SITE_ORIGIN", DEFAULT_SITE_ORIGIN)?;
    let user_agent = or_default("TABLEWATCH_USER_AGENT", DEFAULT_USER_AGENT);

    let login_timeout_secs = parse_secs("TABLEWATCH_LOGIN_TIMEOUT_SECS", "60")?;
    let navigation_timeout_secs = parse_secs("TABLEWATCH_NAVIGATION_TIMEOUT_SECS", "30")?;
    let venue_timeout_secs = parse_secs("TABLEWATCH_VENUE_TIMEOUT_SECS", "300")?;

    Ok(AppConfig {
        username,
        password,
        log_level,
        session_path,
        catalog_path,
        webdriver_url,
        api_base,
        site_origin,
        user_agent,
        login_timeout_secs,
        navigation_timeout_secs,
        venue_timeout_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
