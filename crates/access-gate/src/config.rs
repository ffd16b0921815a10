//! Access Gate configuration.
//!
//! Configuration is loaded from environment variables. Two independent
//! sections exist because the two flows usually run in separate hosts:
//! [`Config`] for bearer-token verification and [`HomeDirectoryConfig`] for
//! directory-backed home directory grants.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default signing key set cache TTL in seconds (1 hour).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// Default timeout for fetching the signing key set.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default partition root inside the home bucket.
pub const DEFAULT_HOME_PREFIX: &str = "uploads";

/// Default timeout for a user directory lookup.
pub const DEFAULT_DIRECTORY_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}

/// Bearer-token verification configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Identity provider user pool (directory) identifier.
    pub user_pool_id: String,

    /// Region hosting the user pool.
    pub region: String,

    /// Signing key set URL, derived from pool and region unless overridden.
    pub jwks_url: String,

    /// How long a fetched key set is considered fresh.
    pub jwks_cache_ttl: Duration,

    /// Upper bound on a single key set fetch.
    pub jwks_fetch_timeout: Duration,

    /// Tolerance for `iat` values in the future.
    pub jwt_clock_skew: Duration,

    /// Optional audience (`aud` or `client_id`) every token must carry.
    pub token_audience: Option<String>,

    /// Optional exact issuer every token must carry.
    pub token_issuer: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let user_pool_id = required(vars, "USER_POOL_ID")?;
        let region = required(vars, "COGNITO_REGION")?;

        let jwks_url = optional(vars, "JWKS_URL")
            .unwrap_or_else(|| user_pool_jwks_url(&region, &user_pool_id));

        let jwks_cache_ttl = positive_seconds(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?;

        let jwks_fetch_timeout = positive_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;

        let jwt_clock_skew = positive_seconds(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
        )?;
        if jwt_clock_skew > MAX_CLOCK_SKEW {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                jwt_clock_skew.as_secs()
            )));
        }

        Ok(Self {
            user_pool_id,
            region,
            jwks_url,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwt_clock_skew,
            token_audience: optional(vars, "TOKEN_AUDIENCE"),
            token_issuer: optional(vars, "TOKEN_ISSUER"),
        })
    }
}

/// Directory-path (home directory grant) configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeDirectoryConfig {
    /// Bucket holding every user's partition.
    pub home_bucket: String,

    /// Role (principal) the storage service assumes on the user's behalf.
    pub transfer_role_arn: String,

    /// Partition root; a user's partition is `{home_prefix}/{username}`.
    pub home_prefix: String,

    /// Upper bound on a single directory lookup.
    pub directory_timeout: Duration,
}

impl HomeDirectoryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let home_bucket = required(vars, "HOME_BUCKET")?;
        if home_bucket.contains('/') {
            return Err(ConfigError::InvalidValue(format!(
                "HOME_BUCKET must be a bare bucket name, got '{}'",
                home_bucket
            )));
        }

        let transfer_role_arn = required(vars, "TRANSFER_ROLE_ARN")?;

        let home_prefix = optional(vars, "HOME_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_HOME_PREFIX.to_string());
        if home_prefix.is_empty() || home_prefix.contains(|c| c == '*' || c == '?') {
            return Err(ConfigError::InvalidValue(
                "HOME_PREFIX must be a non-empty path without wildcards".to_string(),
            ));
        }

        let directory_timeout = positive_seconds(
            vars,
            "DIRECTORY_TIMEOUT_SECONDS",
            DEFAULT_DIRECTORY_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            home_bucket,
            transfer_role_arn,
            home_prefix,
            directory_timeout,
        })
    }
}

/// Well-known signing key set location for a user pool.
pub fn user_pool_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!(
        "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
        region, user_pool_id
    )
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = optional(vars, name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(Duration::from_secs(value))
}
