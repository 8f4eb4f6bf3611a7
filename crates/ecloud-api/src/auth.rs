//! HMAC-SHA1 request signing for the ECloud OpenAPI.
//!
//! The signature is computed over the alphabetically sorted `key=value`
//! parameter pairs joined with `&`, using RAW values. URL encoding happens
//! only when the final query string is built, never inside the signature.

use hmac::{Hmac, Mac};
use sha1::Sha1;

const SIGNATURE_METHOD: &str = "HmacSHA1";
const SIGNATURE_VERSION: &str = "V2.0";
const API_VERSION: &str = "2016-12-05";

/// Build the full set of signed authentication parameters for one request.
///
/// Each call produces a fresh nonce and timestamp, so parameters are never
/// reusable across requests.
pub(crate) fn auth_params(access_key_id: &str, access_key_secret: &str) -> Vec<(&'static str, String)> {
    let nonce = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut params: Vec<(&'static str, String)> = vec![
        ("AccessKey", access_key_id.to_string()),
        ("SignatureMethod", SIGNATURE_METHOD.to_string()),
        ("SignatureVersion", SIGNATURE_VERSION.to_string()),
        ("SignatureNonce", nonce),
        ("Timestamp", timestamp),
        ("Version", API_VERSION.to_string()),
    ];

    let signature = sign(&params, access_key_secret);
    params.push(("Signature", signature));
    params
}

/// HMAC-SHA1 over the canonical parameter string, lowercase hex output.
///
/// Any `Signature` entry already present is excluded from the canonical
/// string so signing is idempotent.
pub(crate) fn sign(params: &[(&'static str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> =
        params.iter().filter(|(key, _)| *key != "Signature").collect();
    sorted.sort_by_key(|(key, _)| *key);

    let canonical = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(canonical.as_bytes());
    let digest = mac.finalize().into_bytes();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_params() -> Vec<(&'static str, String)> {
        vec![
            ("AccessKey", "AK".into()),
            ("SignatureMethod", "HmacSHA1".into()),
            ("SignatureVersion", "V2.0".into()),
            ("SignatureNonce", "nonce-1".into()),
            ("Timestamp", "2024-06-01T00:00:00Z".into()),
            ("Version", "2016-12-05".into()),
        ]
    }

    #[test]
    fn signature_is_deterministic_for_fixed_input() {
        let a = sign(&fixed_params(), "secret");
        let b = sign(&fixed_params(), "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40); // SHA-1 digest, hex-encoded
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_ignores_parameter_order() {
        let mut reversed = fixed_params();
        reversed.reverse();
        assert_eq!(sign(&fixed_params(), "secret"), sign(&reversed, "secret"));
    }

    #[test]
    fn existing_signature_entry_is_excluded() {
        let mut with_sig = fixed_params();
        with_sig.push(("Signature", "bogus".into()));
        assert_eq!(sign(&fixed_params(), "secret"), sign(&with_sig, "secret"));
    }

    #[test]
    fn secret_changes_signature() {
        assert_ne!(sign(&fixed_params(), "secret"), sign(&fixed_params(), "other"));
    }

    #[test]
    fn auth_params_carry_signature_and_fresh_nonce() {
        let first = auth_params("AK", "secret");
        let second = auth_params("AK", "secret");

        let nonce = |params: &[(&str, String)]| {
            params
                .iter()
                .find(|(key, _)| *key == "SignatureNonce")
                .map(|(_, value)| value.clone())
                .unwrap()
        };
        assert_ne!(nonce(&first), nonce(&second));
        assert!(first.iter().any(|(key, _)| *key == "Signature"));
    }
}
