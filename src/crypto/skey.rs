use sha2::{Digest, Sha256};

/// Derives the session token (skey) handed out to clients from the
/// provider-issued session key.
///
/// Deterministic and one-way: the stored skey/session_key pair is the only
/// relationship validation ever needs, so the raw key is never derivable
/// from the token a client presents.
///
/// # Arguments
///
/// * `session_key` - The provider-issued session key material.
///
/// # Returns
///
/// A lowercase hex digest.
pub fn derive_skey(session_key: &str) -> String {
    hex::encode(Sha256::digest(session_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_token() {
        assert_eq!(derive_skey("k1"), derive_skey("k1"));
    }

    #[test]
    fn different_keys_different_tokens() {
        let tokens: Vec<String> = (0..64).map(|i| derive_skey(&format!("key-{i}"))).collect();
        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn token_is_hex_digest() {
        let token = derive_skey("HyVFkGl5F5OQWJZZaNzBBg==");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
