//! Startup configuration.
//!
//! Read once, validated, then moved into [`AuthRuntime`](crate::AuthRuntime).
//! Nothing here is global.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::roles::DEFAULT_ROLE_PREFIX;
use crate::{KeyError, SigningKey};

pub const ENV_SIGNING_KEY: &str = "WARDEN_SIGNING_KEY";
pub const ENV_TOKEN_TTL_SECS: &str = "WARDEN_TOKEN_TTL_SECS";
pub const ENV_PROVIDERS: &str = "WARDEN_PROVIDERS";
pub const ENV_ROLE_PREFIX: &str = "WARDEN_ROLE_PREFIX";

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 900;
/// Ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingKey(&'static str),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid token ttl '{0}': expected between 1 and {max} seconds", max = MAX_TOKEN_TTL_SECS)]
    InvalidTtl(String),

    #[error("unknown credential provider '{0}'")]
    UnknownProvider(String),

    #[error("credential provider '{0}' configured more than once")]
    DuplicateProvider(ProviderKind),

    #[error("at least one credential provider must be configured")]
    EmptyProviders,

    #[error("the password provider is enabled but no credential store was supplied")]
    MissingCredentialStore,
}

/// Built-in provider selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Password,
    Token,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Password => "password",
            ProviderKind::Token => "token",
        }
    }

    /// Parse a comma-separated, ordered provider list (`"password,token"`).
    pub fn parse_list(list: &str) -> Result<Vec<ProviderKind>, ConfigError> {
        let kinds = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ProviderKind>)
            .collect::<Result<Vec<_>, _>>()?;
        Self::validate(kinds)
    }

    fn validate(kinds: Vec<ProviderKind>) -> Result<Vec<ProviderKind>, ConfigError> {
        if kinds.is_empty() {
            return Err(ConfigError::EmptyProviders);
        }
        for (i, kind) in kinds.iter().enumerate() {
            if kinds[..i].contains(kind) {
                return Err(ConfigError::DuplicateProvider(*kind));
            }
        }
        Ok(kinds)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Ok(ProviderKind::Password),
            "token" | "bearer" => Ok(ProviderKind::Token),
            other => Err(ConfigError::UnknownProvider(other.to_owned())),
        }
    }
}

#[derive(Debug)]
pub struct AuthConfig {
    pub signing_key: SigningKey,
    pub default_ttl: Duration,
    pub providers: Vec<ProviderKind>,
    pub role_prefix: String,
}

impl AuthConfig {
    /// Config with defaults for everything but the key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            default_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            providers: vec![ProviderKind::Password, ProviderKind::Token],
            role_prefix: DEFAULT_ROLE_PREFIX.to_owned(),
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Result<Self, ConfigError> {
        self.default_ttl = check_ttl(ttl)?;
        Ok(self)
    }

    pub fn with_providers(mut self, providers: Vec<ProviderKind>) -> Result<Self, ConfigError> {
        self.providers = ProviderKind::validate(providers)?;
        Ok(self)
    }

    pub fn with_role_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_prefix = prefix.into();
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let material = var(ENV_SIGNING_KEY)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingKey(ENV_SIGNING_KEY))?;
        let signing_key = SigningKey::from_material(material.as_bytes())?;

        let mut config = Self::new(signing_key);

        if let Some(raw) = var(ENV_TOKEN_TTL_SECS) {
            let ttl = raw
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(Duration::try_seconds)
                .filter(|ttl| in_range(*ttl))
                .ok_or_else(|| ConfigError::InvalidTtl(raw.clone()))?;
            config.default_ttl = ttl;
        }

        if let Some(raw) = var(ENV_PROVIDERS) {
            config.providers = ProviderKind::parse_list(&raw)?;
        }

        if let Some(prefix) = var(ENV_ROLE_PREFIX) {
            config.role_prefix = prefix;
        }

        tracing::info!(
            ttl_secs = config.default_ttl.num_seconds(),
            providers = ?config.providers,
            role_prefix = %config.role_prefix,
            "auth configuration loaded"
        );

        Ok(config)
    }
}

/// Tokens carry whole-second timestamps, so anything under a second could
/// never be issued.
pub(crate) fn check_ttl(ttl: Duration) -> Result<Duration, ConfigError> {
    if in_range(ttl) {
        Ok(ttl)
    } else {
        Err(ConfigError::InvalidTtl(ttl.to_string()))
    }
}

fn in_range(ttl: Duration) -> bool {
    ttl >= Duration::seconds(1) && ttl <= Duration::seconds(MAX_TOKEN_TTL_SECS)
}
