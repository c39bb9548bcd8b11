//! Signed cookie handling.
//!
//! # Responsibilities
//! - Parse the Cookie header into name/value pairs
//! - Sign and verify cookie values with the server secret
//! - Build Set-Cookie values for session issue and removal
//!
//! # Design Decisions
//! - Signature is a keyed SHA-256 digest appended as `value.hexdigest`
//! - Verification is constant-time over the digest bytes
//! - Session cookies are HttpOnly and scoped to the whole site

use sha2::{Digest, Sha256};

/// Sign a cookie value: `value.hexdigest`.
pub fn sign(value: &str, secret: &str) -> String {
    format!("{}.{}", value, digest(value, secret))
}

/// Verify a signed cookie value, returning the inner value when the
/// signature matches.
pub fn verify(signed: &str, secret: &str) -> Option<String> {
    let (value, signature) = signed.rsplit_once('.')?;
    let expected = digest(value, secret);
    if constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
        Some(value.to_string())
    } else {
        None
    }
}

fn digest(value: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(value.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parse a Cookie header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Set-Cookie value issuing a session cookie.
pub fn build_set_cookie(name: &str, signed_value: &str, max_age_secs: u64) -> String {
    format!("{name}={signed_value}; Path=/; HttpOnly; Max-Age={max_age_secs}")
}

/// Set-Cookie value removing a session cookie.
pub fn build_clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let signed = sign("session-id-123", "secret");
        assert_eq!(verify(&signed, "secret"), Some("session-id-123".to_string()));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signed = sign("session-id-123", "secret");
        assert_eq!(verify(&signed, "other"), None);
    }

    #[test]
    fn test_verify_rejects_tampered_value() {
        let signed = sign("session-id-123", "secret");
        let tampered = signed.replacen("123", "456", 1);
        assert_eq!(verify(&tampered, "secret"), None);
        assert_eq!(verify("no-signature", "secret"), None);
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; forum.sid=abc.def; empty=");
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                ("forum.sid".to_string(), "abc.def".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_set_cookie_shape() {
        assert_eq!(
            build_set_cookie("forum.sid", "v.sig", 3600),
            "forum.sid=v.sig; Path=/; HttpOnly; Max-Age=3600"
        );
        assert!(build_clear_cookie("forum.sid").contains("Max-Age=0"));
    }
}
