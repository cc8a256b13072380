// Password hashing and verification utilities using bcrypt

use thiserror::Error;

/// Errors that can occur during password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingError(String),

    #[error("Failed to verify password: {0}")]
    VerificationError(String),
}

/// Hash a password with bcrypt at the given cost factor
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(|e| PasswordError::HashingError(e.to_string()))
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash is an error, never a silent mismatch: the stored
/// value must always be a bcrypt verifier.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hashed).map_err(|e| PasswordError::VerificationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the tests fast
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "Passw0rd!";

        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");
        assert!(hash.starts_with("$2"));

        assert!(verify_password(password, &hash).expect("Failed to verify password"));
        assert!(!verify_password("WrongPassword", &hash).expect("Failed to verify password"));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = "Passw0rd!";

        let hash1 = hash_password(password, TEST_COST).unwrap();
        let hash2 = hash_password(password, TEST_COST).unwrap();

        // Random salt: same password, different hashes
        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_plaintext_stored_value_is_an_error_not_a_match() {
        // A raw password in the verifier column must never verify by
        // string equality
        let result = verify_password("Passw0rd!", "Passw0rd!");
        assert!(result.is_err());
    }
}
