use std::env;

use thiserror::Error;

use crate::security::{AccessPolicy, CsrfProtection, FilterChain};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("JWT_SECRET cannot be empty")]
    EmptySecret,
    #[error("SECURITY_POLICY=authenticated requires JWT_SECRET")]
    MissingSecret,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: Option<String>,
    pub access_policy: AccessPolicy,
    pub csrf: CsrfProtection,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    reason: format!("'{}' is not a positive integer", raw),
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if secret.is_empty() => return Err(ConfigError::EmptySecret),
            other => other,
        };

        let access_policy = match lookup("SECURITY_POLICY") {
            Some(raw) => raw.parse::<AccessPolicy>().map_err(|reason| ConfigError::Invalid {
                key: "SECURITY_POLICY",
                reason,
            })?,
            None => AccessPolicy::default(),
        };

        let csrf = match lookup("SECURITY_CSRF") {
            Some(raw) => raw.parse::<CsrfProtection>().map_err(|reason| ConfigError::Invalid {
                key: "SECURITY_CSRF",
                reason,
            })?,
            None => CsrfProtection::default(),
        };

        if access_policy == AccessPolicy::Authenticated && jwt_secret.is_none() {
            return Err(ConfigError::MissingSecret);
        }

        Ok(Settings {
            bind_address,
            database_url,
            database_max_connections,
            jwt_secret,
            access_policy,
            csrf,
        })
    }

    pub fn filter_chain(&self) -> FilterChain {
        FilterChain::new(self.csrf, self.access_policy, self.jwt_secret.clone())
    }
}
