//! Password digests and generated passwords

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of passwords produced by [`generate_password`]
pub const GENERATED_PASSWORD_LEN: usize = 8;

/// Lowercase hex SHA-256 of the password, the stored format for backend users
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(stored_hash)
}

/// Random alphanumeric password for new or reset accounts
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("admin123"),
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
    }

    #[test]
    fn test_verify() {
        let stored = hash_password("s3cret");
        assert!(verify_password("s3cret", &stored));
        assert!(verify_password("s3cret", &stored.to_uppercase()));
        assert!(!verify_password("S3cret", &stored));
    }

    #[test]
    fn test_generated_passwords() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.len(), GENERATED_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
