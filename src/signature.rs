// src/signature.rs
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the webhook signature header value for a payload.
///
/// The signature is HMAC-SHA256 over the exact bytes given, hex-encoded and
/// prefixed with `sha256=`, matching the `X-Webhook-Signature` header format.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header against a payload.
///
/// Fails closed: a missing prefix, non-hex digest, or mismatch all return
/// false. The digest comparison is constant-time.
pub fn verify(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let secret = "shared-secret";
        let payload = br#"{"job_id":"j1","url":"https://example.com/job"}"#;
        let header = sign(secret, payload);
        assert!(header.starts_with("sha256="));
        assert!(verify(secret, payload, &header));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let payload = b"payload bytes";
        assert_eq!(sign("secret", payload), sign("secret", payload));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let secret = "shared-secret";
        let header = sign(secret, b"original payload");
        assert!(!verify(secret, b"original payloae", &header));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let header = sign("secret-a", b"payload");
        assert!(!verify("secret-b", b"payload", &header));
    }

    #[test]
    fn test_malformed_headers_fail_closed() {
        let secret = "shared-secret";
        let payload = b"payload";
        let digest = sign(secret, payload);
        let bare_hex = digest.strip_prefix("sha256=").unwrap();

        assert!(!verify(secret, payload, ""));
        assert!(!verify(secret, payload, bare_hex));
        assert!(!verify(secret, payload, &format!("sha1={}", bare_hex)));
        assert!(!verify(secret, payload, "sha256="));
        assert!(!verify(secret, payload, "sha256=not-hex-at-all"));
    }
}
