// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch verification errors.
//!
//! [`LaunchError`] is never raised across the resolver boundary. It is turned
//! into an `{ "error": { "code", "message" } }` context so the consuming page
//! has a single shape to branch on. [`ProviderError`] covers faults inside the
//! validator itself and does propagate.

use serde_json::{json, Value};

/// Reasons a launch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    /// Required LTI launch parameters are missing or wrong
    #[error("Invalid LTI parameters: {0}")]
    InvalidParameters(String),
    /// `oauth_consumer_key` does not match the configured key
    #[error("Request does not match consumer key")]
    ConsumerMismatch,
    /// Signature method other than HMAC-SHA1
    #[error("Unsupported signature method: {0}")]
    UnsupportedSignatureMethod(String),
    /// Timestamp missing, unparsable, or outside the accepted window
    #[error("Expired or invalid timestamp")]
    ExpiredTimestamp,
    /// Nonce missing or already used inside the replay window
    #[error("Nonce already used")]
    NonceReused,
    /// Signature does not verify
    #[error("Invalid signature")]
    InvalidSignature,
    /// Stored context could not be decoded or parsed
    #[error("Malformed launch context: {0}")]
    MalformedContext(String),
    /// Context could not be serialized for storage
    #[error("Launch context could not be encoded: {0}")]
    EncodeFailed(String),
}

impl LaunchError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            LaunchError::InvalidParameters(_) => "invalid_parameters",
            LaunchError::ConsumerMismatch => "consumer_mismatch",
            LaunchError::UnsupportedSignatureMethod(_) => "unsupported_signature_method",
            LaunchError::ExpiredTimestamp => "expired_timestamp",
            LaunchError::NonceReused => "nonce_reused",
            LaunchError::InvalidSignature => "invalid_signature",
            LaunchError::MalformedContext(_) => "malformed_context",
            LaunchError::EncodeFailed(_) => "encode_failed",
        }
    }

    /// The error descriptor stored under the `error` key of a context.
    pub fn descriptor(&self) -> Value {
        json!({
            "code": self.error_code(),
            "message": self.to_string(),
        })
    }

    /// Full `{ "error": descriptor }` envelope.
    pub fn envelope(&self) -> Value {
        json!({ "error": self.descriptor() })
    }
}

/// Faults inside a launch validator. These are not verification outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("nonce store unavailable")]
    NonceStoreUnavailable,

    #[error("validator failure: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_code_and_message() {
        let envelope = LaunchError::InvalidSignature.envelope();
        assert_eq!(envelope["error"]["code"], "invalid_signature");
        assert_eq!(envelope["error"]["message"], "Invalid signature");
    }

    #[test]
    fn codes_are_snake_case() {
        let errors = [
            LaunchError::InvalidParameters("x".into()),
            LaunchError::ConsumerMismatch,
            LaunchError::UnsupportedSignatureMethod("RSA-SHA1".into()),
            LaunchError::ExpiredTimestamp,
            LaunchError::NonceReused,
            LaunchError::InvalidSignature,
            LaunchError::MalformedContext("x".into()),
            LaunchError::EncodeFailed("x".into()),
        ];
        for error in errors {
            let code = error.error_code();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{code}");
        }
    }

    #[test]
    fn detail_is_included_in_message() {
        let error = LaunchError::UnsupportedSignatureMethod("RSA-SHA1".into());
        assert_eq!(error.to_string(), "Unsupported signature method: RSA-SHA1");
    }
}
