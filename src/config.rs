//! Configuration management for the recipe agent.
//!
//! Configuration can be set via environment variables:
//! - `SPOONACULAR_API_KEY` - Recipe API key. A warning is logged when missing and
//!   the placeholder `YOUR_API_KEY_HERE` is sent instead.
//! - `SPOONACULAR_BASE_URL` - Optional. Recipe API base URL. Defaults to `https://api.spoonacular.com`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `SWML_BASIC_AUTH_USER` - Optional. Basic auth user. Defaults to `signalwire`.
//! - `SWML_BASIC_AUTH_PASSWORD` - Optional. Basic auth password. Generated when unset.
//! - `SWML_SSL_ENABLED` - Optional. Serve over TLS. Defaults to `false`.
//! - `SWML_SSL_CERT_PATH` / `SWML_SSL_KEY_PATH` - PEM files, required when TLS is enabled.
//! - `SWML_DOMAIN` - Optional. Public host name used in webhook URLs when TLS is enabled.
//! - `SWML_PROXY_URL_BASE` - Optional. Public base URL (e.g. behind a tunnel or proxy).
//! - `POST_PROMPT_URL` - Optional. Where the platform posts the conversation summary.

use std::path::PathBuf;

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Placeholder sent to the recipe API when no key is configured.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Default recipe API base URL.
pub const DEFAULT_RECIPE_API_BASE: &str = "https://api.spoonacular.com";

/// Default basic auth user name.
pub const DEFAULT_AUTH_USER: &str = "signalwire";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Basic auth credentials protecting the webhook endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,

    /// True when the password was generated rather than configured.
    pub generated: bool,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            generated: false,
        }
    }

    fn generate(username: String) -> Self {
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self {
            username,
            password,
            generated: true,
        }
    }
}

/// TLS configuration.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,

    /// Public domain announced in webhook URLs
    pub domain: Option<String>,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Recipe API key (or the placeholder)
    pub api_key: String,

    /// Whether `api_key` came from the environment
    pub api_key_configured: bool,

    /// Recipe API base URL, without trailing slash
    pub recipe_api_base: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    pub auth: BasicAuth,

    pub tls: TlsConfig,

    /// Public base URL for webhook URLs, overriding the request host
    pub proxy_url_base: Option<String>,

    /// Post-conversation summary webhook
    pub post_prompt_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (api_key, api_key_configured) = match get("SPOONACULAR_API_KEY") {
            Some(key) => (key, true),
            None => {
                tracing::warn!(
                    "Missing environment variable SPOONACULAR_API_KEY; recipe lookups will fail until it is set \
                     (export SPOONACULAR_API_KEY=your_api_key_here)"
                );
                (API_KEY_PLACEHOLDER.to_string(), false)
            }
        };

        let recipe_api_base = get("SPOONACULAR_BASE_URL")
            .unwrap_or_else(|| DEFAULT_RECIPE_API_BASE.to_string());
        url::Url::parse(&recipe_api_base).map_err(|e| {
            ConfigError::InvalidValue("SPOONACULAR_BASE_URL".to_string(), e.to_string())
        })?;
        let recipe_api_base = recipe_api_base.trim_end_matches('/').to_string();

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = get("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let username = get("SWML_BASIC_AUTH_USER").unwrap_or_else(|| DEFAULT_AUTH_USER.to_string());
        let auth = match get("SWML_BASIC_AUTH_PASSWORD") {
            Some(password) => BasicAuth::new(username, password),
            None => BasicAuth::generate(username),
        };

        let tls = TlsConfig {
            enabled: get("SWML_SSL_ENABLED")
                .map(|v| {
                    parse_bool(&v)
                        .map_err(|e| ConfigError::InvalidValue("SWML_SSL_ENABLED".to_string(), e))
                })
                .transpose()?
                .unwrap_or(false),
            cert_path: get("SWML_SSL_CERT_PATH").map(PathBuf::from),
            key_path: get("SWML_SSL_KEY_PATH").map(PathBuf::from),
            domain: get("SWML_DOMAIN"),
        };

        if tls.enabled {
            for (var, path) in [
                ("SWML_SSL_CERT_PATH", &tls.cert_path),
                ("SWML_SSL_KEY_PATH", &tls.key_path),
            ] {
                match path {
                    None => return Err(ConfigError::MissingEnvVar(var.to_string())),
                    Some(p) if !p.exists() => {
                        return Err(ConfigError::InvalidValue(
                            var.to_string(),
                            format!("file not found: {}", p.display()),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        let proxy_url_base = get("SWML_PROXY_URL_BASE")
            .map(|v| {
                url::Url::parse(&v)
                    .map(|_| v.trim_end_matches('/').to_string())
                    .map_err(|e| ConfigError::InvalidValue("SWML_PROXY_URL_BASE".to_string(), e.to_string()))
            })
            .transpose()?;

        // An unusable summary URL only disables summaries; it does not stop the agent.
        let post_prompt_url = get("POST_PROMPT_URL").and_then(|v| match url::Url::parse(&v) {
            Ok(_) => Some(v),
            Err(e) => {
                tracing::warn!("Failed to set post prompt URL {:?}: {}", v, e);
                None
            }
        });

        Ok(Self {
            api_key,
            api_key_configured,
            recipe_api_base,
            host,
            port,
            auth,
            tls,
            proxy_url_base,
            post_prompt_url,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, recipe_api_base: String) -> Self {
        Self {
            api_key,
            api_key_configured: true,
            recipe_api_base: recipe_api_base.trim_end_matches('/').to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            auth: BasicAuth::new(DEFAULT_AUTH_USER, "secret"),
            tls: TlsConfig::default(),
            proxy_url_base: None,
            post_prompt_url: None,
        }
    }

    /// Scheme the server is reachable under.
    pub fn scheme(&self) -> &'static str {
        if self.tls.enabled {
            "https"
        } else {
            "http"
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
