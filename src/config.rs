//! Configuration management for the equipment booking server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::{env, str::FromStr};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database settings as read from files and environment.
///
/// Either `url` or the discrete fields are used, never a mix of both; see
/// [`DatabaseConfig::resolve`].
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // BOOKING__SERVER__PORT=8080 style overrides
            .add_source(
                Environment::with_prefix("BOOKING")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env_non_blank("DATABASE_URL"))?
            .set_override_option("database.host", env_non_blank("DB_HOST"))?
            .set_override_option("database.port", env_number("DB_PORT"))?
            .set_override_option("database.user", env_non_blank("DB_USER"))?
            .set_override_option("database.password", env::var("DB_PASSWORD").ok())?
            .set_override_option("database.name", env_non_blank("DB_NAME"))?
            .set_override_option("auth.jwt_secret", env_non_blank("JWT_SECRET"))?
            .set_override_option("server.port", env_number("PORT"))?
            .build()?;

        config.try_deserialize()
    }
}

fn env_non_blank(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_number(key: &str) -> Option<i64> {
    env_non_blank(key).and_then(|v| v.trim().parse().ok())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Concrete database connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DatabaseTarget {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "equipment_booking".to_string(),
        }
    }
}

/// Where the connection settings were taken from, in precedence order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    /// A full connection URI (`DATABASE_URL` / `database.url`)
    Uri(String),
    /// Discrete host/port/user/password/name settings, gaps filled from local defaults
    Discrete(DatabaseTarget),
    /// Nothing configured: local development defaults
    LocalDefaults(DatabaseTarget),
}

impl DatabaseSource {
    /// Human readable description with the password masked
    pub fn describe(&self) -> String {
        match self {
            DatabaseSource::Uri(url) => format!("uri {}", mask_uri_password(url)),
            DatabaseSource::Discrete(t) => format!("discrete {}", describe_target(t)),
            DatabaseSource::LocalDefaults(t) => format!("local defaults {}", describe_target(t)),
        }
    }
}

fn describe_target(t: &DatabaseTarget) -> String {
    let password = if t.password.is_empty() { "<none>" } else { "******" };
    format!(
        "host={} port={} user={} password={} database={}",
        t.host, t.port, t.user, password, t.name
    )
}

fn mask_uri_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host_part)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}://{}:******@{}", scheme, user, host_part),
        None => url.to_string(),
    }
}

impl DatabaseConfig {
    /// Resolve the connection source.
    ///
    /// 1. a non-blank `url` wins;
    /// 2. otherwise, if any discrete field is set, the discrete fields are used
    ///    and missing ones fall back to [`DatabaseTarget::default`];
    /// 3. otherwise the local defaults are used as a whole.
    pub fn resolve(&self) -> DatabaseSource {
        if let Some(url) = non_blank(&self.url) {
            return DatabaseSource::Uri(url);
        }

        let defaults = DatabaseTarget::default();
        let has_discrete = [&self.host, &self.user, &self.name]
            .into_iter()
            .any(|v| non_blank(v).is_some())
            || self.port.is_some()
            || self.password.is_some();

        if !has_discrete {
            return DatabaseSource::LocalDefaults(defaults);
        }

        DatabaseSource::Discrete(DatabaseTarget {
            host: non_blank(&self.host).unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            user: non_blank(&self.user).unwrap_or(defaults.user),
            password: self.password.clone().unwrap_or(defaults.password),
            name: non_blank(&self.name).unwrap_or(defaults.name),
        })
    }

    /// Build the sqlx connect options for the resolved source
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match self.resolve() {
            DatabaseSource::Uri(url) => PgConnectOptions::from_str(&url),
            DatabaseSource::Discrete(t) | DatabaseSource::LocalDefaults(t) => Ok(PgConnectOptions::new()
                .host(&t.host)
                .port(t.port)
                .username(&t.user)
                .password(&t.password)
                .database(&t.name)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
            jwt_expiration_hours: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
