//! Salted one-way hashing of caller network addresses.
//!
//! Raw addresses are never stored or used as map keys: rate limiting
//! and usage accounting key on an HMAC-SHA256 of the address, truncated
//! to 16 hex characters. Without the salt the stored hashes cannot be
//! reversed to recover addresses.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Length in hex characters of the derived identity.
const IDENTITY_HEX_LEN: usize = 16;

/// Derive the stable identity for a caller address.
pub fn hash_identity(address: &str, salt: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(address.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut hex = String::with_capacity(IDENTITY_HEX_LEN);
    for byte in digest.iter().take(IDENTITY_HEX_LEN / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_same_input() {
        assert_eq!(
            hash_identity("203.0.113.7", "salt"),
            hash_identity("203.0.113.7", "salt"),
        );
    }

    #[test]
    fn sixteen_hex_chars() {
        let id = hash_identity("203.0.113.7", "salt");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salt_changes_output() {
        assert_ne!(
            hash_identity("203.0.113.7", "salt-a"),
            hash_identity("203.0.113.7", "salt-b"),
        );
    }

    #[test]
    fn address_changes_output() {
        assert_ne!(
            hash_identity("203.0.113.7", "salt"),
            hash_identity("203.0.113.8", "salt"),
        );
    }
}
