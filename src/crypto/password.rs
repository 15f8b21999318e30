use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 600_000;
// Unit tests sign up dozens of accounts; keep derivation cheap there.
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

/// Derived password hash: zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct PasswordHash {
    hash_bytes: [u8; HASH_LENGTH],
}

impl PasswordHash {
    /// Derive from password + salt using PBKDF2-SHA256
    pub fn derive(password: &str, salt: &[u8]) -> Self {
        let mut hash_bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut hash_bytes);
        Self { hash_bytes }
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.hash_bytes
    }

    /// Constant-time comparison against a stored hash.
    pub fn matches(&self, stored: &[u8]) -> bool {
        if stored.len() != HASH_LENGTH {
            return false;
        }
        self.hash_bytes.ct_eq(stored).unwrap_u8() == 1
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let salt = [42u8; SALT_LENGTH];
        let h1 = PasswordHash::derive("password", &salt);
        let h2 = PasswordHash::derive("password", &salt);
        assert_eq!(h1.as_bytes(), h2.as_bytes());
    }

    #[test]
    fn different_passwords_produce_different_hashes() {
        let salt = [42u8; SALT_LENGTH];
        let h1 = PasswordHash::derive("password1", &salt);
        let h2 = PasswordHash::derive("password2", &salt);
        assert_ne!(h1.as_bytes(), h2.as_bytes());
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let h1 = PasswordHash::derive("password", &[1u8; SALT_LENGTH]);
        let h2 = PasswordHash::derive("password", &[2u8; SALT_LENGTH]);
        assert_ne!(h1.as_bytes(), h2.as_bytes());
    }

    #[test]
    fn matches_checks_length_and_content() {
        let salt = generate_salt();
        let hash = PasswordHash::derive("hunter22", &salt);
        let stored = hash.as_bytes().to_vec();
        assert!(PasswordHash::derive("hunter22", &salt).matches(&stored));
        assert!(!PasswordHash::derive("hunter23", &salt).matches(&stored));
        assert!(!hash.matches(&stored[..16]));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
