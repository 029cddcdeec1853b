use std::path::PathBuf;

use crate::ConfigError;

/// Platform login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub log_level: String,
    pub session_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub webdriver_url: String,
    pub api_base: String,
    pub site_origin: String,
    pub user_agent: String,
    pub login_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub venue_timeout_secs: u64,
}

impl AppConfig {
    /// Credentials for an interactive login. Only needed when no session is
    /// stored, so their absence is not an error until this is called.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("DISNEY_USERNAME".to_string()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("DISNEY_PASSWORD".to_string()))?;
        Ok(Credentials { username, password })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("log_level", &self.log_level)
            .field("session_path", &self.session_path)
            .field("catalog_path", &self.catalog_path)
            .field("webdriver_url", &self.webdriver_url)
            .field("api_base", &self.api_base)
            .field("site_origin", &self.site_origin)
            .field("user_agent", &self.user_agent)
            .field("login_timeout_secs", &self.login_timeout_secs)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("venue_timeout_secs", &self.venue_timeout_secs)
            .finish()
    }
}
