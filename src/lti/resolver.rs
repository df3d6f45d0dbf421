// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch context resolution.
//!
//! The request method and the `persist` flag pick one of three paths:
//!
//! | Method   | `persist` | Result                                              |
//! |----------|-----------|-----------------------------------------------------|
//! | POST     | any       | verified body or `{ error }`, stored when persisting |
//! | non-POST | `true`    | stored context, `{}` when absent, `{ error }` when corrupt |
//! | non-POST | `false`   | `{}`, and any stored cookie is cleared              |

use std::sync::Arc;

use axum::{extract::Request, http::Method};
use axum_extra::extract::cookie::CookieJar;

use super::{
    context::LaunchContext,
    cookie::{ContextCookie, CookieName, CookieOptions},
    error::ProviderError,
    normalize::{normalize, NormalizedLaunch},
    provider::{LaunchValidator, Verdict},
};

/// Consumer credentials and cookie policy for one tool.
#[derive(Clone)]
pub struct PersistenceConfig {
    /// OAuth consumer key
    pub key: String,
    /// Shared secret for the consumer key
    pub secret: String,
    /// Keep the launch context in a cookie across page loads
    pub persist: bool,
    /// Also store rejected launches (the page then sees the error on reload)
    pub persist_failures: bool,
    pub cookie_name: CookieName,
    /// Overrides applied on top of the cookie defaults
    pub cookie_options: CookieOptions,
}

impl PersistenceConfig {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            persist: false,
            persist_failures: true,
            cookie_name: CookieName::default(),
            cookie_options: CookieOptions::default(),
        }
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_persist_failures(mut self, persist_failures: bool) -> Self {
        self.persist_failures = persist_failures;
        self
    }

    pub fn with_cookie_name(mut self, cookie_name: CookieName) -> Self {
        self.cookie_name = cookie_name;
        self
    }

    pub fn with_cookie_options(mut self, cookie_options: CookieOptions) -> Self {
        self.cookie_options = cookie_options;
        self
    }

    fn cookie(&self) -> ContextCookie {
        ContextCookie::new(self.cookie_name.clone())
    }
}

impl std::fmt::Debug for PersistenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceConfig")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("persist", &self.persist)
            .field("persist_failures", &self.persist_failures)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_options", &self.cookie_options)
            .finish()
    }
}

/// Establishes or rehydrates the launch context for a request.
#[derive(Clone)]
pub struct LaunchContextResolver {
    validator: Arc<dyn LaunchValidator>,
}

impl LaunchContextResolver {
    pub fn new(validator: Arc<dyn LaunchValidator>) -> Self {
        Self { validator }
    }

    /// Resolve the context for `request`, returning the updated cookie jar.
    ///
    /// Rejected launches and unreadable cookies come back as `{ error }`
    /// contexts. Only validator faults are returned as `Err`.
    pub async fn resolve(
        &self,
        config: &PersistenceConfig,
        jar: CookieJar,
        request: Request,
    ) -> Result<(CookieJar, LaunchContext), ProviderError> {
        if request.method() == Method::POST {
            let launch = normalize(request).await;
            return self.verify(config, jar, &launch).await;
        }

        let cookie = config.cookie();
        if config.persist {
            let context = cookie.read(&jar);
            if context.is_error() {
                tracing::warn!(cookie = %cookie.name(), "Stored launch context is unreadable");
            }
            return Ok((jar, context));
        }

        let jar = cookie.clear(jar, &config.cookie_options);
        tracing::debug!(cookie = %cookie.name(), "Persistence disabled, launch cookie cleared");
        Ok((jar, LaunchContext::empty()))
    }

    /// Validate a normalized launch and store the outcome when persisting.
    pub async fn verify(
        &self,
        config: &PersistenceConfig,
        jar: CookieJar,
        launch: &NormalizedLaunch,
    ) -> Result<(CookieJar, LaunchContext), ProviderError> {
        let verdict = self
            .validator
            .validate(launch, &config.key, &config.secret)
            .await?;

        let store = match &verdict {
            Verdict::Valid(context) => {
                tracing::info!(
                    consumer_key = %config.key,
                    resource_link_id = context.resource_link_id().unwrap_or_default(),
                    user_id = context.user_id().unwrap_or_default(),
                    "LTI launch verified"
                );
                config.persist
            }
            Verdict::Invalid(error) => {
                tracing::warn!(
                    consumer_key = %config.key,
                    error_code = error.error_code(),
                    error = %error,
                    "LTI launch rejected"
                );
                config.persist && config.persist_failures
            }
        };

        let context = verdict.into_context();
        let jar = if store {
            config.cookie().persist(jar, &context, &config.cookie_options)
        } else {
            jar
        };
        Ok((jar, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lti::{
        codec,
        cookie::DEFAULT_COOKIE_NAME,
        error::LaunchError,
        provider::{test_support::*, OAuth1Validator},
    };
    use async_trait::async_trait;
    use axum::{body::Body, http};
    use axum_extra::extract::cookie::Cookie;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::Duration;

    /// Validator returning a fixed verdict and counting calls.
    struct StubValidator {
        verdict: Result<Verdict, ()>,
        calls: AtomicUsize,
    }

    impl StubValidator {
        fn new(verdict: Verdict) -> Arc<Self> {
            Arc::new(Self {
                verdict: Ok(verdict),
                calls: AtomicUsize::new(0),
            })
        }

        fn faulty() -> Arc<Self> {
            Arc::new(Self {
                verdict: Err(()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LaunchValidator for StubValidator {
        async fn validate(
            &self,
            _launch: &NormalizedLaunch,
            _key: &str,
            _secret: &str,
        ) -> Result<Verdict, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
                .clone()
                .map_err(|_| ProviderError::Internal("boom".to_string()))
        }
    }

    fn sample_body() -> LaunchContext {
        LaunchContext::from_value(json!({"resource_link_id": "rl1", "user_id": "u1"})).unwrap()
    }

    fn request(method: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/lti/launch")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("oauth_consumer_key=ck1"))
            .unwrap()
    }

    fn config(persist: bool) -> PersistenceConfig {
        PersistenceConfig::new("ck1", "s3cret").with_persist(persist)
    }

    /// Carry the cookie written by one response into the next request.
    fn next_request_jar(jar: &CookieJar) -> CookieJar {
        match jar.get(DEFAULT_COOKIE_NAME) {
            Some(cookie) => CookieJar::new().add(Cookie::new(
                DEFAULT_COOKIE_NAME,
                cookie.value().to_string(),
            )),
            None => CookieJar::new(),
        }
    }

    #[tokio::test]
    async fn post_then_get_rehydrates_same_body() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let config = config(true);

        let (jar, ctx) = resolver
            .resolve(&config, CookieJar::new(), request("POST"))
            .await
            .unwrap();
        assert_eq!(ctx, sample_body());
        assert_eq!(
            jar.get(DEFAULT_COOKIE_NAME).unwrap().value(),
            codec::encode(&sample_body())
        );

        let (_, rehydrated) = resolver
            .resolve(&config, next_request_jar(&jar), request("GET"))
            .await
            .unwrap();
        assert_eq!(rehydrated, ctx);
        assert_eq!(
            serde_json::to_string(&rehydrated).unwrap(),
            serde_json::to_string(&ctx).unwrap()
        );
    }

    #[tokio::test]
    async fn invalid_post_is_cached_as_error() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Invalid(
            LaunchError::InvalidSignature,
        )));
        let config = config(true);

        let (jar, ctx) = resolver
            .resolve(&config, CookieJar::new(), request("POST"))
            .await
            .unwrap();
        assert_eq!(ctx.error().unwrap()["code"], "invalid_signature");

        let (_, rehydrated) = resolver
            .resolve(&config, next_request_jar(&jar), request("GET"))
            .await
            .unwrap();
        assert_eq!(rehydrated, ctx);
    }

    #[tokio::test]
    async fn failures_are_not_stored_when_disabled() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Invalid(
            LaunchError::InvalidSignature,
        )));
        let config = config(true).with_persist_failures(false);

        let (jar, ctx) = resolver
            .resolve(&config, CookieJar::new(), request("POST"))
            .await
            .unwrap();
        assert!(ctx.is_error());
        assert!(jar.get(DEFAULT_COOKIE_NAME).is_none());
    }

    #[tokio::test]
    async fn post_without_persist_sets_no_cookie() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let (jar, ctx) = resolver
            .resolve(&config(false), CookieJar::new(), request("POST"))
            .await
            .unwrap();
        assert_eq!(ctx, sample_body());
        assert!(jar.get(DEFAULT_COOKIE_NAME).is_none());
    }

    #[tokio::test]
    async fn get_without_persist_clears_existing_cookie() {
        let validator = StubValidator::new(Verdict::Valid(sample_body()));
        let resolver = LaunchContextResolver::new(validator.clone());
        let stale = CookieJar::new().add(Cookie::new(
            DEFAULT_COOKIE_NAME,
            codec::encode(&sample_body()),
        ));

        let (jar, ctx) = resolver
            .resolve(&config(false), stale, request("GET"))
            .await
            .unwrap();
        assert!(ctx.is_empty());
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);

        let cookie = jar.get(DEFAULT_COOKIE_NAME).unwrap();
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(codec::decode_context(cookie.value()).is_empty());
    }

    #[tokio::test]
    async fn get_with_persist_and_no_cookie_is_empty() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let (jar, ctx) = resolver
            .resolve(&config(true), CookieJar::new(), request("GET"))
            .await
            .unwrap();
        assert!(ctx.is_empty());
        assert!(jar.get(DEFAULT_COOKIE_NAME).is_none());
    }

    #[tokio::test]
    async fn corrupt_cookie_rehydrates_as_error() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let jar = CookieJar::new().add(Cookie::new(DEFAULT_COOKIE_NAME, "%%%"));
        let (_, ctx) = resolver
            .resolve(&config(true), jar, request("GET"))
            .await
            .unwrap();
        assert_eq!(ctx.error().unwrap()["code"], "malformed_context");
    }

    #[tokio::test]
    async fn all_non_post_methods_rehydrate() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let jar = CookieJar::new().add(Cookie::new(
            DEFAULT_COOKIE_NAME,
            codec::encode(&sample_body()),
        ));

        for method in ["GET", "HEAD", "PUT", "DELETE", "PATCH"] {
            let (_, ctx) = resolver
                .resolve(&config(true), jar.clone(), request(method))
                .await
                .unwrap();
            assert_eq!(ctx, sample_body(), "method {method}");
        }
    }

    #[tokio::test]
    async fn cookie_overrides_and_name_are_applied() {
        let resolver = LaunchContextResolver::new(StubValidator::new(Verdict::Valid(sample_body())));
        let name = CookieName::namespaced("ck1");
        let config = config(true)
            .with_cookie_name(name.clone())
            .with_cookie_options(CookieOptions::default().with_path("/tool").with_secure(true));

        let (jar, _) = resolver
            .resolve(&config, CookieJar::new(), request("POST"))
            .await
            .unwrap();
        let cookie = jar.get(name.as_str()).unwrap();
        assert_eq!(cookie.path(), Some("/tool"));
        assert_eq!(cookie.secure(), Some(true));
        assert!(jar.get(DEFAULT_COOKIE_NAME).is_none());
    }

    #[tokio::test]
    async fn validator_faults_propagate() {
        let resolver = LaunchContextResolver::new(StubValidator::faulty());
        let result = resolver
            .resolve(&config(true), CookieJar::new(), request("POST"))
            .await;
        assert!(matches!(result, Err(ProviderError::Internal(_))));
    }

    #[tokio::test]
    async fn signed_launch_end_to_end() {
        let resolver = LaunchContextResolver::new(Arc::new(OAuth1Validator::default()));
        let config = config(true);
        let body = signed_form("https", "ck1", "s3cret", "e2e-1", now(), &launch_fields());
        let post = http::Request::builder()
            .method("POST")
            .uri(TEST_PATH)
            .header("host", TEST_HOST)
            .header("x-forwarded-proto", "https")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let (jar, ctx) = resolver.resolve(&config, CookieJar::new(), post).await.unwrap();
        assert!(!ctx.is_error(), "{ctx:?}");
        assert_eq!(ctx.user_id(), Some("u1"));
        assert!(ctx.is_instructor());
        assert!(ctx.get("oauth_signature").is_none());

        let (_, rehydrated) = resolver
            .resolve(&config, next_request_jar(&jar), request("GET"))
            .await
            .unwrap();
        assert_eq!(
            Value::Object(rehydrated.into_map()),
            Value::Object(ctx.into_map())
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", config(true));
        assert!(rendered.contains("ck1"));
        assert!(!rendered.contains("s3cret"));
    }
}
