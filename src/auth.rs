use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Duration;
use rand::Rng;

use crate::entities::{Date, PasswordReset};
use crate::handlers::{Error, Result};

pub const RESET_TTL_MINUTES: i64 = 10;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(anyhow!("cannot hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// mirrors the 6-digit numeric code the reset mail flow expects
pub fn generate_reset(now: Date) -> PasswordReset {
    let otp = rand::thread_rng().gen_range(100_000..1_000_000).to_string();

    PasswordReset {
        otp,
        expires: now + Duration::minutes(RESET_TTL_MINUTES),
    }
}
