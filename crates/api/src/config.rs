//! Process configuration from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | insecure dev secret (warned) |
//! | `TRIGGER_MAX_ATTEMPTS` | `3` |
//! | `TRIGGER_RETRY_BASE_MS` | `100` |
//! | `INCREMENT_ID_FAILURE_POLICY` | `swallow` |
//! | `DATABASE_URL` | unset (in-memory store); used with the `postgres` feature |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use recordkeep_functions::FailurePolicy;
use recordkeep_infra::RetryPolicy;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub trigger_retry: RetryPolicy,
    pub failure_policy: FailurePolicy,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse::<SocketAddr>(&lookup, "BIND_ADDR", "0.0.0.0:8080".parse().ok())?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let max_attempts: u32 = parse(&lookup, "TRIGGER_MAX_ATTEMPTS", Some(3))?;
        if max_attempts == 0 {
            return Err(ConfigError {
                key: "TRIGGER_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let base_ms: u64 = parse(&lookup, "TRIGGER_RETRY_BASE_MS", Some(100))?;

        let failure_policy = match lookup("INCREMENT_ID_FAILURE_POLICY") {
            None => FailurePolicy::default(),
            Some(raw) => raw.parse().map_err(|reason| ConfigError {
                key: "INCREMENT_ID_FAILURE_POLICY",
                value: raw.clone(),
                reason,
            })?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            trigger_retry: RetryPolicy::exponential(max_attempts, Duration::from_millis(base_ms)),
            failure_policy,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        })
    }

    /// In-memory configuration with fast retries, bound to an ephemeral port.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            trigger_retry: RetryPolicy::exponential(3, Duration::from_millis(5)),
            failure_policy: FailurePolicy::default(),
            database_url: None,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match (lookup(key), default) {
        (Some(raw), _) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(ConfigError {
            key,
            value: String::new(),
            reason: "missing".to_string(),
        }),
    }
}
