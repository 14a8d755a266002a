use std::time::Duration;

use crate::auth::{MAX_HASH_COST, MIN_HASH_COST};
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

/// Deployment environment, selects the log format and default level
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    pub request_timeout: u64,   // seconds
    pub keep_alive: u64,        // seconds
    pub shutdown_timeout: u64,  // seconds
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Session credential settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub signing_key: String,
    pub issuer: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub hash_cost: u32,
    pub operation_timeout: u64,     // seconds, per storage round trip
    pub scan_timeout: u64,          // seconds, refresh token hash scan
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("hash_cost", &self.hash_cost)
            .field("operation_timeout", &self.operation_timeout)
            .field("scan_timeout", &self.scan_timeout)
            .finish()
    }
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_expiry)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout)
    }

    /// Reject settings the token manager or hasher could not work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_key".to_string()));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_expiry must be positive".to_string(),
            ));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.hash_cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        if self.operation_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.operation_timeout must be positive".to_string(),
            ));
        }
        if self.scan_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.scan_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) overlaid with
/// `APP_`-prefixed environment variables, e.g. `APP_AUTH__SIGNING_KEY`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
