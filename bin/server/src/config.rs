//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys:
//!
//! - `BIND_ADDR`
//! - `ACCESS__ALLOWED_EMAILS` (see [`AccessConfig`])
//! - `PROVIDER__API_KEY`, `PROVIDER__ENDPOINT`
//! - `SESSION__IDLE_MINUTES`, `SESSION__CLEANUP_INTERVAL_SECONDS`,
//!   `SESSION__SECURE_COOKIES`

use serde::Deserialize;
use tandem_access::AccessConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Allow-list configuration.
    #[serde(default)]
    pub access: AccessConfig,

    /// Hosted identity provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Browser client session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// Hosted identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Web API key of the identity provider project. Without it the server
    /// runs against an in-memory account directory.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the provider's REST API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
        }
    }
}

/// Browser client session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes a browser client may stay idle before its session store is
    /// torn down.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,

    /// Interval between idle-client cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_idle_minutes() -> i64 {
    12 * 60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
