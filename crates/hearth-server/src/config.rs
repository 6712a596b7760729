//! Server settings.
//!
//! Loaded from an optional TOML file and `HEARTH__*` environment variables
//! (double underscore separates nesting, e.g. `HEARTH__AUTH__PEPPER`).
//! Environment wins over the file.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use hearth_auth::{AuthConfig, AuthError, HashCost, PasswordPolicy};
use hearth_db::DbConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no {0} configured (set the inline PEM or a path)")]
    MissingKey(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_filter: "hearth=info,hearth_server=info,hearth_auth=info,hearth_db=info".into(),
            database: DatabaseSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let db = DbConfig::default();
        Self {
            url: db.url,
            namespace: db.namespace,
            database: db.database,
            username: db.username,
            password: db.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub private_key_pem: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub public_key_pem: Option<String>,
    pub public_key_path: Option<PathBuf>,
    pub issuer: String,
    pub audience: String,
    pub access_token_lifetime_secs: u64,
    pub refresh_token_lifetime_secs: u64,
    pub email_verification_lifetime_secs: u64,
    pub password_reset_lifetime_secs: u64,
    pub pepper: Option<String>,
    pub hash_cost: HashCost,
    pub password_policy: PasswordPolicy,
    pub blocking_timeout_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let auth = AuthConfig::default();
        Self {
            private_key_pem: None,
            private_key_path: None,
            public_key_pem: None,
            public_key_path: None,
            issuer: auth.jwt_issuer,
            audience: auth.jwt_audience,
            access_token_lifetime_secs: auth.access_token_lifetime_secs,
            refresh_token_lifetime_secs: auth.refresh_token_lifetime_secs,
            email_verification_lifetime_secs: auth.email_verification_lifetime_secs,
            password_reset_lifetime_secs: auth.password_reset_lifetime_secs,
            pepper: auth.pepper,
            hash_cost: auth.hash_cost,
            password_policy: auth.password_policy,
            blocking_timeout_ms: auth.blocking_timeout_ms,
            store_timeout_ms: auth.store_timeout_ms,
        }
    }
}

fn read_key(
    inline: &Option<String>,
    path: &Option<PathBuf>,
    what: &'static str,
) -> Result<String, SettingsError> {
    if let Some(pem) = inline.as_ref().filter(|pem| !pem.trim().is_empty()) {
        return Ok(pem.clone());
    }
    let path = path.as_ref().ok_or(SettingsError::MissingKey(what))?;
    fs::read_to_string(path).map_err(|source| SettingsError::KeyFile {
        path: path.clone(),
        source,
    })
}

impl Settings {
    /// Loads `<name>.toml` (if present) overlaid with `HEARTH__*` variables.
    pub fn load(name: &str) -> Result<Self, SettingsError> {
        Self::build(Config::builder().add_source(File::with_name(name).required(false)))
    }

    /// Loads from a TOML document overlaid with `HEARTH__*` variables.
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings = builder
            .add_source(
                Environment::with_prefix("HEARTH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database.url.clone(),
            namespace: self.database.namespace.clone(),
            database: self.database.database.clone(),
            username: self.database.username.clone(),
            password: self.database.password.clone(),
        }
    }

    /// Resolves key material and builds the auth service configuration.
    pub fn auth_config(&self) -> Result<AuthConfig, SettingsError> {
        let auth = &self.auth;
        let config = AuthConfig {
            jwt_private_key_pem: read_key(
                &auth.private_key_pem,
                &auth.private_key_path,
                "JWT signing key",
            )?,
            jwt_public_key_pem: read_key(
                &auth.public_key_pem,
                &auth.public_key_path,
                "JWT verification key",
            )?,
            jwt_issuer: auth.issuer.clone(),
            jwt_audience: auth.audience.clone(),
            access_token_lifetime_secs: auth.access_token_lifetime_secs,
            refresh_token_lifetime_secs: auth.refresh_token_lifetime_secs,
            email_verification_lifetime_secs: auth.email_verification_lifetime_secs,
            password_reset_lifetime_secs: auth.password_reset_lifetime_secs,
            pepper: auth.pepper.clone(),
            hash_cost: auth.hash_cost,
            password_policy: auth.password_policy.clone(),
            blocking_timeout_ms: auth.blocking_timeout_ms,
            store_timeout_ms: auth.store_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }
}
