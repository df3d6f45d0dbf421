// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch signature validation.
//!
//! [`LaunchValidator`] is the seam to whatever checks launch signatures. The
//! bundled [`OAuth1Validator`] follows the LTI 1.x provider rules:
//!
//! 1. `lti_message_type`, `lti_version` and `resource_link_id` are present and valid
//! 2. `oauth_consumer_key` matches the configured key
//! 3. signature method is HMAC-SHA1 and the signature verifies
//! 4. timestamp is inside the window and the nonce has not been seen in it
//!
//! A valid launch yields the body without `oauth_*` parameters.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    context::LaunchContext,
    error::{LaunchError, ProviderError},
    nonce::{NonceStore, DEFAULT_NONCE_CAPACITY},
    normalize::NormalizedLaunch,
    oauth,
};

/// Accepted clock difference for `oauth_timestamp`.
pub const TIMESTAMP_WINDOW: Duration = Duration::from_secs(5 * 60);

const LAUNCH_MESSAGE_TYPE: &str = "basic-lti-launch-request";
const LTI_VERSIONS: [&str; 2] = ["LTI-1p0", "LTI-1p2"];

/// Outcome of validating a launch.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(LaunchContext),
    Invalid(LaunchError),
}

impl Verdict {
    /// The context handed to pages: the launch body or an error envelope.
    pub fn into_context(self) -> LaunchContext {
        match self {
            Verdict::Valid(context) => context,
            Verdict::Invalid(error) => LaunchContext::from_error(&error),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

/// Checks a launch for a consumer key/secret pair.
///
/// Rejections are `Ok(Verdict::Invalid(_))`. `Err` is reserved for faults in
/// the validator itself.
#[async_trait]
pub trait LaunchValidator: Send + Sync {
    async fn validate(
        &self,
        launch: &NormalizedLaunch,
        key: &str,
        secret: &str,
    ) -> Result<Verdict, ProviderError>;
}

/// OAuth 1.0 HMAC-SHA1 launch validator with in-process replay protection.
pub struct OAuth1Validator {
    nonces: NonceStore,
    window: Duration,
}

impl OAuth1Validator {
    pub fn new(nonce_capacity: usize) -> Self {
        Self {
            nonces: NonceStore::new(nonce_capacity, TIMESTAMP_WINDOW),
            window: TIMESTAMP_WINDOW,
        }
    }

    fn check_parameters(launch: &NormalizedLaunch) -> Result<(), LaunchError> {
        match launch.param("lti_message_type") {
            Some(LAUNCH_MESSAGE_TYPE) => {}
            Some(other) => {
                return Err(LaunchError::InvalidParameters(format!(
                    "unsupported lti_message_type '{other}'"
                )))
            }
            None => {
                return Err(LaunchError::InvalidParameters(
                    "missing lti_message_type".to_string(),
                ))
            }
        }

        match launch.param("lti_version") {
            Some(version) if LTI_VERSIONS.contains(&version) => {}
            Some(other) => {
                return Err(LaunchError::InvalidParameters(format!(
                    "unsupported lti_version '{other}'"
                )))
            }
            None => {
                return Err(LaunchError::InvalidParameters(
                    "missing lti_version".to_string(),
                ))
            }
        }

        match launch.param("resource_link_id") {
            Some(id) if !id.is_empty() => Ok(()),
            _ => Err(LaunchError::InvalidParameters(
                "missing resource_link_id".to_string(),
            )),
        }
    }

    fn check_timestamp(&self, launch: &NormalizedLaunch) -> Result<(), LaunchError> {
        let timestamp: i64 = launch
            .param("oauth_timestamp")
            .and_then(|t| t.trim().parse().ok())
            .ok_or(LaunchError::ExpiredTimestamp)?;

        let now = chrono::Utc::now().timestamp();
        if now.abs_diff(timestamp) > self.window.as_secs() {
            return Err(LaunchError::ExpiredTimestamp);
        }
        Ok(())
    }
}

impl Default for OAuth1Validator {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_CAPACITY)
    }
}

#[async_trait]
impl LaunchValidator for OAuth1Validator {
    async fn validate(
        &self,
        launch: &NormalizedLaunch,
        key: &str,
        secret: &str,
    ) -> Result<Verdict, ProviderError> {
        if let Err(e) = Self::check_parameters(launch) {
            return Ok(Verdict::Invalid(e));
        }

        if launch.param("oauth_consumer_key") != Some(key) {
            return Ok(Verdict::Invalid(LaunchError::ConsumerMismatch));
        }

        let method = launch.param("oauth_signature_method").unwrap_or_default();
        if method != oauth::SIGNATURE_METHOD {
            return Ok(Verdict::Invalid(LaunchError::UnsupportedSignatureMethod(
                method.to_string(),
            )));
        }

        let signature = launch.param("oauth_signature").unwrap_or_default();
        let base = oauth::base_string(
            launch.method.as_str(),
            &launch.base_url(),
            launch.signing_params(),
        );
        if !oauth::verify(&base, secret, signature) {
            tracing::debug!(base_url = %launch.base_url(), "Launch signature mismatch");
            return Ok(Verdict::Invalid(LaunchError::InvalidSignature));
        }

        // Only signed requests may consume a nonce.
        if let Err(e) = self.check_timestamp(launch) {
            return Ok(Verdict::Invalid(e));
        }
        let nonce = match launch.param("oauth_nonce") {
            Some(nonce) if !nonce.is_empty() => nonce,
            _ => {
                return Ok(Verdict::Invalid(LaunchError::InvalidParameters(
                    "missing oauth_nonce".to_string(),
                )))
            }
        };
        if !self.nonces.check_and_insert(key, nonce)? {
            return Ok(Verdict::Invalid(LaunchError::NonceReused));
        }

        Ok(Verdict::Valid(LaunchContext::from_fields(launch.launch_body())))
    }
}
