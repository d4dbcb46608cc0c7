//! Random secret generation for `JWT_SECRET` and `PASSWORD_SALT`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Minimum number of random bytes; 24 bytes encode to 32 characters.
pub const MIN_BYTES: usize = 24;

/// Generate `bytes` random bytes, URL-safe base64 encoded.
///
/// Requests below [`MIN_BYTES`] are raised to it so the result always
/// passes the server's length check for `JWT_SECRET`.
#[must_use]
pub fn generate(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(MIN_BYTES)];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_length() {
        assert!(generate(1).len() >= 32);
    }

    #[test]
    fn test_secrets_differ() {
        assert_ne!(generate(48), generate(48));
    }

    #[test]
    fn test_url_safe_alphabet() {
        let secret = generate(64);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
