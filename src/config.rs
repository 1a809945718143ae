//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string. Without it the
///   server falls back to the in-memory store.
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PAYSTACK_SECRET_KEY` (required): gateway secret, used for verify calls and webhook HMACs
/// - `PAYSTACK_PUBLIC_KEY` (optional): handed to checkout clients for the hosted widget
/// - `PAYSTACK_BASE_URL` (optional): gateway API root
/// - `GATEWAY_TIMEOUT_SECS` (optional): per-request gateway timeout, defaults to 10
/// - `ADMIN_ACCESS_CODE` (optional): admin credential; the admin API is closed without it
/// - `CONTENT_BASE_URL` (optional): root for downloadable documents and preview images
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub paystack_secret_key: String,

    pub paystack_public_key: Option<String>,

    #[serde(default = "default_paystack_base_url")]
    pub paystack_base_url: String,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    pub admin_access_code: Option<String>,

    #[serde(default = "default_content_base_url")]
    pub content_base_url: String,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_paystack_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_content_base_url() -> String {
    "https://hebbkx1anhila5yf.public.blob.vercel-storage.com".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Secrets are redacted so the config can be logged safely.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("server_port", &self.server_port)
            .field("paystack_secret_key", &"<redacted>")
            .field("paystack_public_key", &self.paystack_public_key)
            .field("paystack_base_url", &self.paystack_base_url)
            .field("gateway_timeout_secs", &self.gateway_timeout_secs)
            .field(
                "admin_access_code",
                &self.admin_access_code.as_ref().map(|_| "<redacted>"),
            )
            .field("content_base_url", &self.content_base_url)
            .field("database_max_connections", &self.database_max_connections)
            .finish()
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{name} is not a valid http(s) URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("PAYSTACK_SECRET_KEY must not be empty")]
    MissingSecret,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., PAYSTACK_SECRET_KEY)
    /// - Environment variable values cannot be parsed into expected types
    /// - A base URL is not an absolute http(s) URL
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: paystack_secret_key -> PAYSTACK_SECRET_KEY
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.paystack_secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        check_base_url("PAYSTACK_BASE_URL", &self.paystack_base_url)?;
        check_base_url("CONTENT_BASE_URL", &self.content_base_url)?;
        Ok(())
    }
}

fn check_base_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: None,
        server_port: 0,
        paystack_secret_key: "sk_test_secret".to_string(),
        paystack_public_key: Some("pk_test_public".to_string()),
        paystack_base_url: default_paystack_base_url(),
        gateway_timeout_secs: 1,
        admin_access_code: Some("823911".to_string()),
        content_base_url: "https://cdn.example.com".to_string(),
        database_max_connections: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_urls() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn rejects_relative_content_url() {
        let mut config = test_config();
        config.content_base_url = "cdn/files".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { name: "CONTENT_BASE_URL", .. })
        ));
    }

    #[test]
    fn rejects_blank_secret() {
        let mut config = test_config();
        config.paystack_secret_key = "   ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("sk_test_secret"));
        assert!(!rendered.contains("823911"));
    }
}
