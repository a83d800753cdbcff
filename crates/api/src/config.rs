//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use lifecycle::LifecycleConfig;

/// Signing secret used when `JWT_SECRET` is unset. Only fit for local runs.
pub const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-me";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `10`)
/// - `STORE_TIMEOUT_MS` — bound on every store call (default: `5000`)
/// - `ORDER_NUMBER_ATTEMPTS` — insert attempts per placement (default: `5`)
/// - `UPDATE_RETRIES` — concurrency retries per transition (default: `3`)
/// - `RESTOCK_ON_CANCEL` — restore stock when an order is cancelled (default: `false`)
/// - `USER_COUNT` — user count reported on the dashboard (default: `0`)
/// - `JWT_SECRET` — HMAC secret for bearer tokens
/// - `JWT_ISSUER` — required `iss` claim, if set
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_timeout: Duration,
    pub order_number_attempts: u32,
    pub update_retries: u32,
    pub restock_on_cancel: bool,
    pub user_count: u64,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed(&lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            store_timeout: parsed(&lookup, "STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            order_number_attempts: parsed(&lookup, "ORDER_NUMBER_ATTEMPTS")
                .unwrap_or(defaults.order_number_attempts),
            update_retries: parsed(&lookup, "UPDATE_RETRIES").unwrap_or(defaults.update_retries),
            restock_on_cancel: parsed(&lookup, "RESTOCK_ON_CANCEL")
                .unwrap_or(defaults.restock_on_cancel),
            user_count: parsed(&lookup, "USER_COUNT").unwrap_or(defaults.user_count),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_issuer: lookup("JWT_ISSUER"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if tokens are signed with the built-in development secret.
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }

    /// Engine settings derived from this configuration.
    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig::default()
            .with_store_timeout(self.store_timeout)
            .with_order_number_attempts(self.order_number_attempts)
            .with_update_retries(self.update_retries)
            .with_restock_on_cancel(self.restock_on_cancel)
    }
}

impl Default for Config {
    fn default() -> Self {
        let lifecycle = LifecycleConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            store_timeout: lifecycle.store_timeout,
            order_number_attempts: lifecycle.order_number_attempts,
            update_retries: lifecycle.update_retries,
            restock_on_cancel: lifecycle.restock_on_cancel,
            user_count: 0,
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_issuer: None,
        }
    }
}

/// Looks up `key` and parses its trimmed value, ignoring values that fail to parse.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(!config.restock_on_cancel);
        assert!(config.uses_development_secret());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("STORE_TIMEOUT_MS", "250"),
            ("ORDER_NUMBER_ATTEMPTS", "7"),
            ("UPDATE_RETRIES", "1"),
            ("RESTOCK_ON_CANCEL", "true"),
            ("USER_COUNT", "12"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_ISSUER", "shop"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.user_count, 12);
        assert_eq!(config.jwt_issuer.as_deref(), Some("shop"));
        assert!(!config.uses_development_secret());

        let lifecycle = config.lifecycle();
        assert_eq!(lifecycle.order_number_attempts, 7);
        assert_eq!(lifecycle.update_retries, 1);
        assert!(lifecycle.restock_on_cancel);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = from_pairs(&[("PORT", "not-a-port"), ("DATABASE_URL", "  ")]);
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_each_setting_parses_to_its_own_type() {
        let config = from_pairs(&[
            ("PORT", " 9000 "),
            ("LOG_FORMAT", "yaml"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("STORE_TIMEOUT_MS", "-1"),
            ("RESTOCK_ON_CANCEL", "yes"),
            ("USER_COUNT", "3"),
        ]);

        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.database_max_connections, 25);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(!config.restock_on_cancel);
        assert_eq!(config.user_count, 3);
    }
}
