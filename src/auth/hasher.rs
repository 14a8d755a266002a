/// Credential Hasher
///
/// One-way bcrypt hashing for refresh tokens. The cost is tunable; the default
/// is bcrypt's `DEFAULT_COST` (12), which takes a few hundred milliseconds per
/// hash on commodity hardware.

use crate::error::HashError;

pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a secret with a fresh salt
    ///
    /// # Errors
    /// Returns error if the cost is out of range or bcrypt fails
    pub fn hash(&self, secret: &str) -> Result<Vec<u8>, HashError> {
        bcrypt::hash(secret, self.cost)
            .map(String::into_bytes)
            .map_err(|e| HashError::Hashing(e.to_string()))
    }

    /// Check `candidate` against a stored hash using bcrypt's verifier.
    /// A malformed stored hash never matches.
    pub fn compare(&self, hash: &[u8], candidate: &str) -> bool {
        let Ok(hash) = std::str::from_utf8(hash) else {
            return false;
        };

        match bcrypt::verify(candidate, hash) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!("Stored credential hash could not be verified: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(MIN_HASH_COST)
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let secret = "o9Xq2LrT5vKp8WmZ3nB7cY1dF4gH6jA0";
        let hash = hasher().hash(secret).expect("Failed to hash");

        assert_ne!(hash, secret.as_bytes());
        assert!(hash.starts_with(b"$2"));
    }

    #[test]
    fn test_compare_matches_own_secret() {
        let secret = "o9Xq2LrT5vKp8WmZ3nB7cY1dF4gH6jA0";
        let hash = hasher().hash(secret).expect("Failed to hash");

        assert!(hasher().compare(&hash, secret));
    }

    #[test]
    fn test_compare_rejects_other_secret() {
        let hash = hasher().hash("first-secret").expect("Failed to hash");

        assert!(!hasher().compare(&hash, "second-secret"));
    }

    #[test]
    fn test_same_secret_salted_differently() {
        let first = hasher().hash("same-secret").expect("Failed to hash");
        let second = hasher().hash("same-secret").expect("Failed to hash");

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!hasher().compare(b"", "secret"));
        assert!(!hasher().compare(b"not-a-bcrypt-hash", "secret"));
        assert!(!hasher().compare(&[0xff, 0xfe], "secret"));
    }

    #[test]
    fn test_invalid_cost() {
        assert!(CredentialHasher::new(MAX_HASH_COST + 1).hash("secret").is_err());
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(CredentialHasher::default().cost(), 12);
    }
}
