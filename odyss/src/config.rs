//! Gateway configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use crate::routes::Route;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Default profile collection name
pub const DEFAULT_USERS_TABLE: &str = "users";

/// Default trip collection name
pub const DEFAULT_TRIPS_TABLE: &str = "trips";

/// Default application base URL (local dev server)
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:5173";

/// Backend gateway configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway project URL
    pub gateway_url: String,
    /// Project anon key sent with every request
    pub anon_key: SecretString,
    /// Profile collection
    pub users_table: String,
    /// Trip collection
    pub trips_table: String,
    /// Base URL email links redirect back to
    pub app_base_url: String,
    /// Attach the owner's phone number to listed trips
    pub enrich_contacts: bool,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let gateway_url =
            std::env::var("ODYSS_GATEWAY_URL").map_err(|_| ConfigError::MissingRequired {
                var: "ODYSS_GATEWAY_URL".to_string(),
                hint: "Set to the project URL, e.g. https://xyzcompany.supabase.co".to_string(),
            })?;

        let anon_key =
            std::env::var("ODYSS_GATEWAY_ANON_KEY").map_err(|_| ConfigError::MissingRequired {
                var: "ODYSS_GATEWAY_ANON_KEY".to_string(),
                hint: "Copy the anon key from the project API settings".to_string(),
            })?;

        let config = GatewayConfig {
            gateway_url,
            anon_key: SecretString::from(anon_key),
            users_table: std::env::var("ODYSS_USERS_TABLE")
                .unwrap_or_else(|_| DEFAULT_USERS_TABLE.to_string()),
            trips_table: std::env::var("ODYSS_TRIPS_TABLE")
                .unwrap_or_else(|_| DEFAULT_TRIPS_TABLE.to_string()),
            app_base_url: std::env::var("ODYSS_APP_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_APP_BASE_URL.to_string()),
            enrich_contacts: parse_env_or("ODYSS_ENRICH_CONTACTS", true),
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration with default table names and base URL
    pub fn new(gateway_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            anon_key: SecretString::from(anon_key.into()),
            users_table: DEFAULT_USERS_TABLE.to_string(),
            trips_table: DEFAULT_TRIPS_TABLE.to_string(),
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            enrich_contacts: true,
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.gateway_url).map_err(|e| ConfigError::Invalid {
            var: "ODYSS_GATEWAY_URL".to_string(),
            reason: e.to_string(),
        })?;

        Url::parse(&self.app_base_url).map_err(|e| ConfigError::Invalid {
            var: "ODYSS_APP_BASE_URL".to_string(),
            reason: e.to_string(),
        })?;

        if self.anon_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "ODYSS_GATEWAY_ANON_KEY".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.users_table.is_empty() || self.trips_table.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ODYSS_USERS_TABLE/ODYSS_TRIPS_TABLE".to_string(),
                reason: "Table names must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Absolute link to `route` under the application base URL
    ///
    /// Used as the redirect target of verification and password-reset emails.
    pub fn redirect_url(&self, route: Route) -> String {
        format!(
            "{}{}",
            self.app_base_url.trim_end_matches('/'),
            route.path()
        )
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse environment variable or return default
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
