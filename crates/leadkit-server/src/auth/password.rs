use anyhow::{anyhow, bail, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Signup policy: 12..=128 characters, not all whitespace.
const MIN_LEN: usize = 12;
const MAX_LEN: usize = 128;

/// Fixed Argon2id parameters; only the memory cost is configurable
/// (`LEADKIT_ARGON2_MEMORY_KB`, default 64MB).
const T_COST: u32 = 3;
const LANES: u32 = 1;
const TAG_LEN: usize = 32;

fn hasher(m_cost: u32) -> Result<Argon2<'static>> {
    let params = Params::new(m_cost, T_COST, LANES, Some(TAG_LEN))
        .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a fresh random salt; returns a PHC-format string.
pub fn hash_password(password: &str, m_cost: u32) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = hasher(m_cost)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(digest.to_string())
}

/// Check a login attempt against a stored PHC hash. The hash string carries
/// its own parameters, so verification works across memory-cost changes.
/// Malformed hashes verify as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Enforce the signup policy before a password ever reaches the hasher.
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        bail!("password is required");
    }
    let len = password.chars().count();
    if len < MIN_LEN {
        bail!("password must be at least {} characters long", MIN_LEN);
    }
    if len > MAX_LEN {
        bail!("password must be at most {} characters long", MAX_LEN);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejects_blank_and_short_passwords() {
        assert!(validate_password_strength("").is_err());
        assert!(validate_password_strength("            ").is_err());
        assert!(validate_password_strength("eleven-char").is_err());
    }

    #[test]
    fn policy_rejects_oversized_password() {
        let long = "x".repeat(MAX_LEN + 1);
        assert!(validate_password_strength(&long).is_err());
    }

    #[test]
    fn policy_accepts_reasonable_passphrase() {
        assert!(validate_password_strength("correct-horse-battery").is_ok());
    }

    #[test]
    fn hash_and_verify_round_trip() {
        // Low m_cost keeps the test fast.
        let hash = hash_password("correct-horse-battery", 8).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery", &hash));
        assert!(!verify_password("wrong-horse-battery", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("whatever-password", "not-a-phc-string"));
    }
}
