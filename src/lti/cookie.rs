// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cookie persistence for launch contexts.
//!
//! One cookie holds the encoded context. Every write replaces the whole
//! value. Clearing writes an encoded `{}` with a zero max-age, so the browser
//! drops it on the next round trip; the server-side jar still sees the empty
//! context until then.

use std::convert::Infallible;

use axum::{
    http::{header::SET_COOKIE, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64ct::{Base64UrlUnpadded, Encoding};
use sha2::{Digest, Sha256};
use time::Duration;

use super::{codec, context::LaunchContext};

/// Fixed cookie name used when no namespace is configured.
pub const DEFAULT_COOKIE_NAME: &str = "HEp8hAsCelpLI3EX";

/// Max-age of a persisted context (one year).
pub const PERSIST_MAX_AGE: Duration = Duration::days(365);

/// Name of the context cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieName(String);

impl CookieName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive a 16-character name from a namespace (app id, consumer key).
    ///
    /// Different namespaces get different slots in the same browser.
    pub fn namespaced(namespace: &str) -> Self {
        let digest = Sha256::digest(namespace.as_bytes());
        // 12 bytes encode to exactly 16 unpadded characters.
        Self(Base64UrlUnpadded::encode_string(&digest[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CookieName {
    fn default() -> Self {
        Self(DEFAULT_COOKIE_NAME.to_string())
    }
}

impl std::fmt::Display for CookieName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cookie attributes. Unset fields fall through to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Option<Duration>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    /// Combine `self` with `overrides`; set fields of `overrides` win.
    pub fn merge(&self, overrides: &CookieOptions) -> CookieOptions {
        CookieOptions {
            max_age: overrides.max_age.or(self.max_age),
            path: overrides.path.clone().or_else(|| self.path.clone()),
            domain: overrides.domain.clone().or_else(|| self.domain.clone()),
            secure: overrides.secure.or(self.secure),
            http_only: overrides.http_only.or(self.http_only),
            same_site: overrides.same_site.or(self.same_site),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Reads and writes the launch context cookie.
#[derive(Debug, Clone, Default)]
pub struct ContextCookie {
    name: CookieName,
}

impl ContextCookie {
    pub fn new(name: CookieName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &CookieName {
        &self.name
    }

    /// Store `context` for a year at `/`, unless `overrides` say otherwise.
    pub fn persist(
        &self,
        jar: CookieJar,
        context: &LaunchContext,
        overrides: &CookieOptions,
    ) -> CookieJar {
        let defaults = CookieOptions::default()
            .with_max_age(PERSIST_MAX_AGE)
            .with_path("/");
        jar.add(self.build(codec::encode(context), &defaults.merge(overrides)))
    }

    /// Current context: `{}` when absent, an error context when unreadable.
    pub fn read(&self, jar: &CookieJar) -> LaunchContext {
        match jar.get(self.name.as_str()) {
            Some(cookie) => codec::decode_context(cookie.value()),
            None => LaunchContext::empty(),
        }
    }

    /// Overwrite the cookie with an encoded `{}` that expires immediately.
    pub fn clear(&self, jar: CookieJar, overrides: &CookieOptions) -> CookieJar {
        let defaults = CookieOptions::default()
            .with_max_age(Duration::ZERO)
            .with_path("/");
        jar.add(self.build(
            codec::encode(&LaunchContext::empty()),
            &defaults.merge(overrides),
        ))
    }

    fn build(&self, value: String, options: &CookieOptions) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.as_str().to_owned(), value));
        if let Some(max_age) = options.max_age {
            builder = builder.max_age(max_age);
        }
        if let Some(path) = &options.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &options.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(secure) = options.secure {
            builder = builder.secure(secure);
        }
        if let Some(http_only) = options.http_only {
            builder = builder.http_only(http_only);
        }
        if let Some(same_site) = options.same_site {
            builder = builder.same_site(same_site);
        }
        builder.build()
    }
}

/// Response part that writes a jar's `Set-Cookie` headers with raw values.
///
/// `CookieJar` percent-encodes values on the way out, turning base64 padding
/// into `%3D`. Context tokens are already cookie-safe and must reach the
/// browser byte for byte.
#[derive(Debug)]
pub struct UnencodedCookies(pub CookieJar);

impl IntoResponseParts for UnencodedCookies {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let mut res = self.0.into_response_parts(res)?;
        let headers = res.headers_mut();
        let written: Vec<String> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        headers.remove(SET_COOKIE);

        for raw in written {
            let plain = match Cookie::parse_encoded(raw.clone()) {
                Ok(cookie) => cookie.to_string(),
                Err(_) => raw,
            };
            if let Ok(value) = HeaderValue::from_str(&plain) {
                headers.append(SET_COOKIE, value);
            }
        }
        Ok(res)
    }
}
