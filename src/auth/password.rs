use crate::error::{AppError, AppResult};

pub const MIN_LENGTH: usize = 5;

pub fn hash(plaintext: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(plaintext, cost).map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))
}

/// Constant-time check via bcrypt; malformed hashes never verify.
pub fn verify(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash("secret1", 4).unwrap();
        assert_ne!(hashed, "secret1");
        assert!(verify("secret1", &hashed));
        assert!(!verify("secret2", &hashed));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify("secret1", "not-a-bcrypt-hash"));
    }
}
