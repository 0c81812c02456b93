//! Credential Hasher
//! Mission: Derive and verify salted PBKDF2 password records
//!
//! Record layout: `base64(salt) "." base64(hash)` with a 16-byte salt and a
//! 32-byte PBKDF2-HMAC-SHA256 output at 100k iterations.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::warn;

/// Salt length in bytes (128 bits).
pub const SALT_BYTES: usize = 16;

/// Derived hash length in bytes (256 bits).
pub const HASH_BYTES: usize = 32;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const RECORD_SEPARATOR: char = '.';

/// Hash a password into a fresh salted record.
///
/// Only fails when the OS entropy source does.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_BYTES];
    OsRng
        .try_fill_bytes(&mut salt)
        .context("Failed to read salt from OS entropy source")?;

    let hash = derive(password, &salt);

    Ok(format!(
        "{}{}{}",
        BASE64.encode(salt),
        RECORD_SEPARATOR,
        BASE64.encode(hash)
    ))
}

/// Verify a password against a stored record.
///
/// Malformed records never verify.
pub fn verify_password(password: &str, record: &str) -> bool {
    let Some((salt_b64, hash_b64)) = record.split_once(RECORD_SEPARATOR) else {
        warn!("Password record has no separator");
        return false;
    };

    let (Ok(salt), Ok(stored)) = (BASE64.decode(salt_b64), BASE64.decode(hash_b64)) else {
        warn!("Password record is not valid base64");
        return false;
    };

    if stored.len() != HASH_BYTES {
        warn!(len = stored.len(), "Password record has unexpected hash length");
        return false;
    }

    let attempt = derive(password, &salt);
    constant_time_eq(&attempt, &stored)
}

/// Burn one derivation so a lookup miss costs the same as a wrong password.
pub fn dummy_verify(password: &str) {
    let _ = derive(password, &[0u8; SALT_BYTES]);
}

fn derive(password: &str, salt: &[u8]) -> [u8; HASH_BYTES] {
    let mut out = [0u8; HASH_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
