use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Salted, adaptive password hashing backed by argon2 with default parameters.
#[derive(Clone, Default)]
pub struct PasswordEncoder {
    argon2: Argon2<'static>,
}

impl PasswordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a PHC string carrying the algorithm, parameters and salt.
    pub fn encode(&self, raw: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Ok(self.argon2.hash_password(raw.as_bytes(), &salt)?.to_string())
    }

    /// False for a wrong password and for a malformed stored hash.
    pub fn matches(&self, raw: &str, encoded: &str) -> bool {
        match PasswordHash::new(encoded) {
            Ok(parsed) => self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}
