// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch request normalization.
//!
//! Turns an inbound request into a [`NormalizedLaunch`]: body fields parsed
//! from JSON or URL-encoded form data, and the scheme the launch was signed
//! against. Reverse proxies hide the original scheme, so any
//! `x-forwarded-proto` header or a TLS connection means `https`.
//!
//! Body problems are never surfaced here. An unreadable body becomes an empty
//! one and the launch fails verification downstream.

use axum::{
    body::{to_bytes, Bytes},
    extract::Request,
    http::{header, request::Parts, HeaderMap, Method},
};
use serde_json::{Map, Value};

/// Largest launch body read before giving up.
pub const MAX_LAUNCH_BODY_BYTES: usize = 64 * 1024;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme used to rebuild the signed base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn default_port(&self) -> &'static str {
        match self {
            Scheme::Http => "80",
            Scheme::Https => "443",
        }
    }
}

/// Connection transport, inserted as a request extension by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Tls,
}

/// A launch request with its body parsed and scheme resolved.
#[derive(Debug, Clone)]
pub struct NormalizedLaunch {
    pub method: Method,
    pub scheme: Scheme,
    /// Lowercased `Host`, port included when present
    pub host: String,
    pub path: String,
    /// Query string parameters in request order
    pub query: Vec<(String, String)>,
    /// Body parameters in request order, one entry per value
    pub params: Vec<(String, String)>,
    /// Body as a JSON object; repeated form keys become arrays
    pub body: Map<String, Value>,
}

impl NormalizedLaunch {
    /// `scheme://host/path` with default ports dropped, as OAuth signs it.
    pub fn base_url(&self) -> String {
        let default_port = format!(":{}", self.scheme.default_port());
        let host = self.host.strip_suffix(&default_port).unwrap_or(&self.host);
        format!("{}://{}{}", self.scheme.as_str(), host, self.path)
    }

    /// First value of a parameter, body before query.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .chain(self.query.iter())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every query and body parameter, for the signature base string.
    pub fn signing_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .iter()
            .chain(self.params.iter())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The body without its `oauth_*` protocol parameters.
    pub fn launch_body(&self) -> Map<String, Value> {
        self.body
            .iter()
            .filter(|(key, _)| !key.starts_with("oauth_"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Parse the request body and resolve the scheme.
pub async fn normalize(request: Request) -> NormalizedLaunch {
    let (parts, body) = request.into_parts();
    let scheme = detect_scheme(&parts);

    let bytes = match to_bytes(body, MAX_LAUNCH_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Launch body unreadable, continuing with empty body");
            Bytes::new()
        }
    };

    let (params, body) = match BodyKind::of(&parts.headers) {
        BodyKind::Json => parse_json(&bytes),
        BodyKind::Form => parse_form(&bytes),
        BodyKind::Other => (Vec::new(), Map::new()),
    };

    let query = parts
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    NormalizedLaunch {
        method: parts.method.clone(),
        scheme,
        host: host(&parts),
        path: parts.uri.path().to_string(),
        query,
        params,
        body,
    }
}

fn detect_scheme(parts: &Parts) -> Scheme {
    let forwarded = parts.headers.contains_key(FORWARDED_PROTO);
    let tls = parts.extensions.get::<Transport>() == Some(&Transport::Tls);
    if forwarded || tls {
        Scheme::Https
    } else {
        Scheme::Http
    }
}

fn host(parts: &Parts) -> String {
    parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string())
        .to_ascii_lowercase()
}

enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || mime.ends_with("+json") {
            BodyKind::Json
        } else if mime == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

fn parse_form(bytes: &[u8]) -> (Vec<(String, String)>, Map<String, Value>) {
    let params: Vec<(String, String)> = url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut body = Map::new();
    for (key, value) in &params {
        match body.get_mut(key) {
            Some(Value::Array(values)) => values.push(Value::String(value.clone())),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value.clone())]);
            }
            None => {
                body.insert(key.clone(), Value::String(value.clone()));
            }
        }
    }
    (params, body)
}

fn parse_json(bytes: &[u8]) -> (Vec<(String, String)>, Map<String, Value>) {
    let body = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(body)) => body,
        Ok(_) => {
            tracing::debug!("JSON launch body is not an object, ignoring it");
            return (Vec::new(), Map::new());
        }
        Err(e) => {
            tracing::debug!(error = %e, "JSON launch body unparsable, ignoring it");
            return (Vec::new(), Map::new());
        }
    };

    let mut params = Vec::new();
    for (key, value) in &body {
        match value {
            Value::Array(values) => {
                params.extend(values.iter().map(|v| (key.clone(), param_text(v))));
            }
            other => params.push((key.clone(), param_text(other))),
        }
    }
    (params, body)
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
