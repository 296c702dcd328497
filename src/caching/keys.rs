//! # Cache Key Derivation
//!
//! Deterministic cache-key construction for the three entry families:
//! authentication results, negative-existence markers, and group
//! memberships.
//!
//! Credential keys must never contain the secret in recoverable form, so the
//! (username, secret) pair is hashed with SHA-256 before it becomes part of
//! a key. The same inputs always yield the same key, which is what makes
//! repeated logins with identical credentials cache hits.

use sha2::{Digest, Sha256};

/// Namespace prefix for authentication entries.
const AUTH_PREFIX: &str = "ldap:user:";

/// Namespace prefix for negative-existence entries.
const NOT_FOUND_PREFIX: &str = "ldap:user:not-found:";

/// Namespace prefix for group-membership entries.
const GROUPS_PREFIX: &str = "ldap:groups:";

/// Delimiter between username and secret before hashing. The unit-separator
/// control character cannot appear in either field, so `("ab", "c")` and
/// `("a", "bc")` can never collide.
const CREDENTIAL_DELIMITER: char = '\u{1f}';

/// Derive the authentication-cache key for a credential pair.
///
/// Callers must reject blank usernames and secrets before derivation; this
/// function only encodes.
pub fn auth_key(username: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(CREDENTIAL_DELIMITER.to_string().as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    format!("{}{}", AUTH_PREFIX, hex::encode(digest))
}

/// Key of the negative-existence marker for a login name.
pub fn not_found_key(username: &str) -> String {
    format!("{}{}", NOT_FOUND_PREFIX, username)
}

/// Key of the group-membership entry for an account name.
pub fn groups_key(sam_account_name: &str) -> String {
    format!("{}{}", GROUPS_PREFIX, sam_account_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_key_is_deterministic() {
        assert_eq!(auth_key("alice", "p1"), auth_key("alice", "p1"));
    }

    #[test]
    fn test_auth_key_varies_with_secret() {
        assert_ne!(auth_key("alice", "p1"), auth_key("alice", "p2"));
        assert_ne!(auth_key("alice", "p1"), auth_key("bob", "p1"));
    }

    #[test]
    fn test_auth_key_never_contains_the_secret() {
        let secret = "super-secret-password";
        let key = auth_key("alice", secret);
        assert!(!key.contains(secret));
        assert!(!key.contains("alice"));
        assert!(key.starts_with(AUTH_PREFIX));
    }

    #[test]
    fn test_delimiter_prevents_concatenation_collisions() {
        assert_ne!(auth_key("ab", "c"), auth_key("a", "bc"));
    }

    #[test]
    fn test_namespace_prefixes_are_distinct() {
        // A login name that happens to look like another namespace must not
        // collide with a real entry of that namespace.
        let key = not_found_key("alice");
        assert!(key.starts_with(NOT_FOUND_PREFIX));
        assert_ne!(key, groups_key("alice"));
    }
}
