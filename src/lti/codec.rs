// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reversible cookie encoding for launch contexts.
//!
//! A context is serialized to JSON and base64-encoded twice (standard
//! alphabet, padded). The double layer keeps the cookie value free of
//! characters some cookie transports mangle. It is not encryption and gives
//! no integrity guarantee.
//!
//! Neither direction fails outward: encoding falls back to an encoded error
//! envelope and decoding falls back to the JSON text of one.

use base64ct::{Base64, Encoding};
use serde::Serialize;

use super::{context::LaunchContext, error::LaunchError};

/// Encode any serializable value into an opaque cookie token.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => encode_json(&json),
        Err(e) => {
            tracing::warn!(error = %e, "Launch context is not serializable, storing error envelope");
            // The envelope is a plain `Value`, whose Display output is its JSON text.
            encode_json(&LaunchError::EncodeFailed(e.to_string()).envelope().to_string())
        }
    }
}

fn encode_json(json: &str) -> String {
    let inner = Base64::encode_string(json.as_bytes());
    Base64::encode_string(inner.as_bytes())
}

/// Reverse both base64 layers and return the JSON text.
///
/// Malformed tokens yield the JSON text of an `{ "error": ... }` envelope so
/// callers can always parse the result.
pub fn decode(token: &str) -> String {
    match decode_json(token) {
        Ok(json) => json,
        Err(e) => e.envelope().to_string(),
    }
}

fn decode_json(token: &str) -> Result<String, LaunchError> {
    let inner = Base64::decode_vec(token.trim())
        .map_err(|e| LaunchError::MalformedContext(format!("outer layer: {e}")))?;
    let bytes = Base64::decode_vec(
        std::str::from_utf8(&inner)
            .map_err(|_| LaunchError::MalformedContext("outer layer is not UTF-8".to_string()))?,
    )
    .map_err(|e| LaunchError::MalformedContext(format!("inner layer: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| LaunchError::MalformedContext("payload is not UTF-8".to_string()))
}

/// Decode a token all the way to a [`LaunchContext`].
///
/// Decoding, JSON parsing, and shape failures all become error contexts.
pub fn decode_context(token: &str) -> LaunchContext {
    let parsed = decode_json(token).and_then(|json| {
        serde_json::from_str(&json)
            .map_err(|e| LaunchError::MalformedContext(format!("invalid JSON: {e}")))
    });

    match parsed.and_then(LaunchContext::from_value) {
        Ok(context) => context,
        Err(e) => {
            tracing::debug!(error = %e, "Stored launch context is unreadable");
            LaunchContext::from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};
    use std::collections::HashMap;

    // Integers only: floats do not survive a JSON text round trip bit for bit.
    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<String>().prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map(any::<String>(), inner, 0..8)
                    .prop_map(|fields| Value::Object(fields.into_iter().collect())),
            ]
        })
    }

    fn arb_context() -> impl Strategy<Value = LaunchContext> {
        prop::collection::btree_map(any::<String>(), arb_json(), 0..8)
            .prop_map(|fields| LaunchContext::from_fields(fields.into_iter().collect::<Map<_, _>>()))
    }

    proptest! {
        #[test]
        fn any_context_survives_encoding(ctx in arb_context()) {
            let token = encode(&ctx);
            prop_assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
            prop_assert_eq!(decode_context(&token), ctx);
        }

        #[test]
        fn truncated_tokens_never_decode(ctx in arb_context(), cut in 1usize..4) {
            let token = encode(&ctx);
            let truncated = &token[..token.len() - cut];
            let decoded = decode_context(truncated);
            prop_assert!(decoded.is_error());
            prop_assert_eq!(&decoded.error().unwrap()["code"], "malformed_context");
        }

        #[test]
        fn tokens_outside_the_alphabet_are_errors(
            prefix in any::<String>(),
            bad in prop::sample::select(vec!['!', '%', '#', ';', ',', '"', '\u{e9}']),
            suffix in any::<String>(),
        ) {
            let token = format!("{prefix}{bad}{suffix}");
            let text = decode(&token);
            let value: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(&value["error"]["code"], "malformed_context");
            prop_assert!(decode_context(&token).is_error());
        }

        #[test]
        fn arbitrary_input_decodes_without_panicking(token in any::<String>()) {
            let ctx = decode_context(&token);
            if !ctx.is_error() {
                let text = decode(&token);
                let value: Value = serde_json::from_str(&text).unwrap();
                let expected = LaunchContext::from_value(value).unwrap();
                prop_assert_eq!(ctx, expected);
            }
        }
    }

    #[test]
    fn round_trip_preserves_context() {
        let ctx = LaunchContext::from_value(json!({
            "resource_link_id": "rl1",
            "user_id": "u1",
            "custom_week": 3,
            "roles": "Learner",
            "nested": {"list": [1, "two", null, true]},
            "unicode": "Zoë ✓",
        }))
        .unwrap();

        let token = encode(&ctx);
        assert_eq!(decode_context(&token), ctx);
    }

    #[test]
    fn encoding_is_two_base64_layers() {
        let token = encode(&json!({}));
        // base64("{}") = "e30=", base64("e30=") = "ZTMwPQ=="
        assert_eq!(token, "ZTMwPQ==");
        assert_eq!(decode(&token), "{}");
    }

    #[test]
    fn token_is_cookie_safe() {
        let token = encode(&json!({"a": "; = , \" \\ \n"}));
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
    }

    #[test]
    fn malformed_tokens_decode_to_error_json() {
        for token in ["%%%", "not base64!", "ZTMw", "e30="] {
            let text = decode(token);
            let value: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["error"]["code"], "malformed_context", "token {token:?}");
        }
    }

    #[test]
    fn malformed_tokens_decode_to_error_context() {
        for token in ["", "%%%", "ZTMw", "e30="] {
            let ctx = decode_context(token);
            assert!(ctx.is_error(), "token {token:?}");
            assert_eq!(ctx.error().unwrap()["code"], "malformed_context");
        }
    }

    #[test]
    fn non_object_payload_is_an_error() {
        let ctx = decode_context(&encode(&json!([1, 2, 3])));
        assert_eq!(ctx.error().unwrap()["code"], "malformed_context");
    }

    #[test]
    fn truncated_token_is_an_error() {
        let token = encode(&json!({"user_id": "u1"}));
        let truncated = &token[..token.len() - 3];
        assert!(decode_context(truncated).is_error());
    }

    #[test]
    fn encoded_null_decodes_to_empty_context() {
        assert!(decode_context(&encode(&Value::Null)).is_empty());
    }

    #[test]
    fn unserializable_value_encodes_error_envelope() {
        // JSON object keys must be strings.
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");

        let ctx = decode_context(&encode(&map));
        assert_eq!(ctx.error().unwrap()["code"], "encode_failed");
    }
}
