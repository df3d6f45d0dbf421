// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth 1.0 HMAC-SHA1 signatures as used by LTI 1.x launches.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Bytes left as-is by OAuth encoding: RFC 3986 unreserved characters.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// RFC 3986 percent-encoding (everything but unreserved characters).
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// Signature base string: `METHOD&enc(url)&enc(normalized params)`.
///
/// `oauth_signature` is excluded; parameters are sorted by encoded name, then
/// encoded value.
pub fn base_string<'a>(
    method: &str,
    base_url: &str,
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .into_iter()
        .filter(|(key, _)| *key != "oauth_signature")
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(&normalized)
    )
}

fn mac(consumer_secret: &str) -> HmacSha1 {
    // LTI launches carry no token secret.
    let key = format!("{}&", percent_encode(consumer_secret));
    // HMAC accepts keys of any length.
    HmacSha1::new_from_slice(key.as_bytes()).unwrap_or_else(|_| unreachable!())
}

/// Base64 HMAC-SHA1 signature of a base string.
pub fn sign(base_string: &str, consumer_secret: &str) -> String {
    let mut mac = mac(consumer_secret);
    mac.update(base_string.as_bytes());
    Base64::encode_string(&mac.finalize().into_bytes())
}

/// Constant-time check of a base64 signature against a base string.
pub fn verify(base_string: &str, consumer_secret: &str, signature: &str) -> bool {
    let Ok(expected) = Base64::decode_vec(signature.trim()) else {
        return false;
    };
    let mut mac = mac(consumer_secret);
    mac.update(base_string.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encode_keeps_unreserved() {
        assert_eq!(percent_encode("abc-._~XYZ019"), "abc-._~XYZ019");
        assert_eq!(percent_encode("a b+c*"), "a%20b%2Bc%2A");
        assert_eq!(percent_encode("ü"), "%C3%BC");
        assert_eq!(percent_encode("a=b&c/d%"), "a%3Db%26c%2Fd%25");
    }

    #[test]
    fn base_string_matches_rfc5849_example() {
        // RFC 5849 section 3.4.1.1, without the token parameters.
        let params = [
            ("b5", "=%3D"),
            ("a3", "a"),
            ("c@", ""),
            ("a2", "r b"),
            ("oauth_consumer_key", "9djdj82h48djs9d2"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131201"),
            ("oauth_nonce", "7d8f3e4a"),
            ("c2", ""),
            ("a3", "2 q"),
            ("oauth_signature", "ignored"),
        ];
        let base = base_string("post", "http://example.com/request", params);
        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q\
             %26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_key\
             %3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_method\
             %3DHMAC-SHA1%26oauth_timestamp%3D137131201"
        );
    }

    #[test]
    fn signature_is_base64_of_sha1_digest() {
        let signature = sign("what do ya want for nothing?", "Jefe");
        assert!(verify("what do ya want for nothing?", "Jefe", &signature));
        // 20 digest bytes
        assert_eq!(Base64::decode_vec(&signature).unwrap().len(), 20);
    }

    #[test]
    fn verify_rejects_tampering() {
        let base = base_string("POST", "http://tool/launch", [("user_id", "u1")]);
        let signature = sign(&base, "secret");

        assert!(verify(&base, "secret", &signature));
        assert!(!verify(&base, "other", &signature));
        let tampered = base_string("POST", "http://tool/launch", [("user_id", "u2")]);
        assert!(!verify(&tampered, "secret", &signature));
        assert!(!verify(&base, "secret", "not-base64!"));
    }
}
