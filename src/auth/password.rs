/// Argon2id password hashing
///
/// Hashes are stored as PHC strings (`$argon2id$v=19$m=...`), so the
/// parameters travel with each hash.
use std::sync::OnceLock;

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;

const SALT_LEN: usize = 16;

/// Verified against when no account matches, so both paths cost the same
fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| hash_password("taskflow-dummy-password").unwrap_or_default())
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut bytes = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes).map_err(|e| anyhow!("invalid password salt: {e}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored hash; malformed hashes never verify
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spend one verification's worth of work without an account
pub fn verify_dummy(password: &str) {
    verify_password(password, dummy_hash());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("Correct horse", &stored));
    }

    #[test]
    fn salts_differ_per_hash() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for stored in [
            "",
            "sha256$1$00$00",
            "$argon2id$v=19$m=19456,t=2,p=1$bm90LWJhc2U2NCE$",
            "$md5$v=1$abc$def",
        ] {
            assert!(!verify_password("anything", stored), "{stored}");
        }
    }

    #[test]
    fn dummy_hash_is_a_real_hash() {
        assert!(dummy_hash().starts_with("$argon2id$"));
        assert!(verify_password("taskflow-dummy-password", dummy_hash()));
    }
}
