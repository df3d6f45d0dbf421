// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used by
//! the launch server. Configuration is loaded from the environment at startup;
//! library callers build a [`PersistenceConfig`] directly instead.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LTI_CONSUMER_KEY` | OAuth consumer key shared with the LMS | Required |
//! | `LTI_CONSUMER_SECRET` | OAuth consumer secret | Required |
//! | `LTI_PERSIST` | Keep the launch context in a cookie | `true` |
//! | `LTI_PERSIST_FAILURES` | Also keep rejected launches | `true` |
//! | `LTI_COOKIE_NAMESPACE` | Derive the cookie name from this namespace | fixed name |
//! | `LTI_COOKIE_DOMAIN` | Cookie `Domain` attribute | unset |
//! | `LTI_COOKIE_SECURE` | Cookie `Secure` attribute | unset |
//! | `LTI_COOKIE_SAME_SITE` | `strict`, `lax` or `none` | unset |
//! | `LTI_NONCE_CAPACITY` | Nonces remembered for replay protection | `10000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use axum_extra::extract::cookie::SameSite;

use crate::lti::{nonce::DEFAULT_NONCE_CAPACITY, CookieName, CookieOptions, PersistenceConfig};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LTI_CONSUMER_KEY_ENV: &str = "LTI_CONSUMER_KEY";
pub const LTI_CONSUMER_SECRET_ENV: &str = "LTI_CONSUMER_SECRET";
pub const LTI_PERSIST_ENV: &str = "LTI_PERSIST";
pub const LTI_PERSIST_FAILURES_ENV: &str = "LTI_PERSIST_FAILURES";
pub const LTI_COOKIE_NAMESPACE_ENV: &str = "LTI_COOKIE_NAMESPACE";
pub const LTI_COOKIE_DOMAIN_ENV: &str = "LTI_COOKIE_DOMAIN";
pub const LTI_COOKIE_SECURE_ENV: &str = "LTI_COOKIE_SECURE";
pub const LTI_COOKIE_SAME_SITE_ENV: &str = "LTI_COOKIE_SAME_SITE";
pub const LTI_NONCE_CAPACITY_ENV: &str = "LTI_NONCE_CAPACITY";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Logging format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Everything the launch server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub lti: PersistenceConfig,
    pub nonce_capacity: usize,
    pub tls: Option<TlsPaths>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get(PORT_ENV) {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: port,
            })?,
            None => DEFAULT_PORT,
        };

        let nonce_capacity = match get(LTI_NONCE_CAPACITY_ENV) {
            Some(capacity) => capacity
                .trim()
                .parse()
                .ok()
                .filter(|c: &usize| *c > 0)
                .ok_or(ConfigError::Invalid {
                    name: LTI_NONCE_CAPACITY_ENV,
                    value: capacity,
                })?,
            None => DEFAULT_NONCE_CAPACITY,
        };

        let mut cookie_options = CookieOptions::default();
        if let Some(domain) = get(LTI_COOKIE_DOMAIN_ENV) {
            cookie_options = cookie_options.with_domain(domain);
        }
        if let Some(secure) = get(LTI_COOKIE_SECURE_ENV) {
            cookie_options = cookie_options.with_secure(parse_bool(LTI_COOKIE_SECURE_ENV, secure)?);
        }
        if let Some(same_site) = get(LTI_COOKIE_SAME_SITE_ENV) {
            cookie_options = cookie_options.with_same_site(parse_same_site(same_site)?);
        }

        let cookie_name = get(LTI_COOKIE_NAMESPACE_ENV)
            .map(|ns| CookieName::namespaced(&ns))
            .unwrap_or_default();

        let persist = match get(LTI_PERSIST_ENV) {
            Some(value) => parse_bool(LTI_PERSIST_ENV, value)?,
            None => true,
        };
        let persist_failures = match get(LTI_PERSIST_FAILURES_ENV) {
            Some(value) => parse_bool(LTI_PERSIST_FAILURES_ENV, value)?,
            None => true,
        };

        let lti = PersistenceConfig::new(
            required(LTI_CONSUMER_KEY_ENV)?,
            required(LTI_CONSUMER_SECRET_ENV)?,
        )
        .with_persist(persist)
        .with_persist_failures(persist_failures)
        .with_cookie_name(cookie_name)
        .with_cookie_options(cookie_options);

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            lti,
            nonce_capacity,
            tls,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            value: self.host.clone(),
        })
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

fn parse_same_site(value: String) -> Result<SameSite, ConfigError> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        _ => Err(ConfigError::Invalid {
            name: LTI_COOKIE_SAME_SITE_ENV,
            value,
        }),
    }
}
