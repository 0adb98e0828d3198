//! Salted one-way password hashing.
//!
//! PBKDF2-HMAC-SHA256 with a random per-user salt, stored as a PHC string
//! (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`) so the round count
//! travels with the hash.

use pbkdf2::password_hash::{
    Error as PhcError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use pbkdf2::{Params, Pbkdf2};

use super::CryptoError;

const SCHEME: &str = "pbkdf2-sha256";

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 600_000;
// Unit tests hash many passwords; verification reads the count from the
// stored hash, so this only affects newly created hashes.
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    hash_with_rounds(password, PBKDF2_ITERATIONS)
}

/// Hash with an explicit round count.
pub fn hash_with_rounds(password: &str, rounds: u32) -> Result<String, CryptoError> {
    let salt = SaltString::encode_b64(&generate_salt())
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    let params = Params {
        rounds,
        output_length: HASH_LENGTH,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash. The digest comparison inside
/// `password_hash` is constant-time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(stored).map_err(|_| CryptoError::MalformedHash)?;
    if parsed.algorithm.as_str() != SCHEME {
        return Err(CryptoError::UnsupportedScheme(parsed.algorithm.to_string()));
    }
    match Pbkdf2.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PhcError::Password) => Ok(false),
        Err(_) => Err(CryptoError::MalformedHash),
    }
}

/// Generate a cryptographically random salt
fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
