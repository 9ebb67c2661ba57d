/// Hash a plaintext password with bcrypt.
pub fn hash(plaintext: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
}

/// Verify plaintext against a stored hash. Malformed hashes never verify.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    bcrypt::verify(plaintext, stored).unwrap_or(false)
}
