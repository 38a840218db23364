use base64ct::{Base64, Encoding};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::error;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const ITERATIONS: u32 = 100_000;

fn derive(plain: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(plain.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

/// Hash a password as base64(salt || PBKDF2-HMAC-SHA256(password, salt)).
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt).map_err(|e| {
        error!(error = %e, "os rng failure");
        anyhow::anyhow!(e.to_string())
    })?;

    let key = derive(plain, &salt);
    let mut stored = Vec::with_capacity(SALT_LEN + KEY_LEN);
    stored.extend_from_slice(&salt);
    stored.extend_from_slice(&key);
    Ok(Base64::encode_string(&stored))
}

/// Check `plain` against a value produced by [`hash_password`].
/// Malformed stored values never match.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(decoded) = Base64::decode_vec(stored) else {
        return false;
    };
    if decoded.len() != SALT_LEN + KEY_LEN {
        return false;
    }
    let (salt, expected) = decoded.split_at(SALT_LEN);
    constant_time_eq(&derive(plain, salt), expected)
}

/// Compares every byte regardless of where the first difference is.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn hash_layout_is_salt_then_key() {
        let hash = hash_password("password123").unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(Base64::decode_vec(&hash).unwrap().len(), SALT_LEN + KEY_LEN);
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("password123", &a));
        assert!(verify_password("password123", &b));
    }

    #[test]
    fn unicode_and_empty_passwords_roundtrip() {
        for pw in ["", "pässwörd-ünïcödé", "密码密码密码密码"] {
            let hash = hash_password(pw).unwrap();
            assert!(verify_password(pw, &hash), "{pw:?}");
        }
    }

    #[test]
    fn verify_returns_false_on_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
        // valid base64, too short
        assert!(!verify_password("anything", &Base64::encode_string(&[1u8; 20])));
        // valid base64, too long
        assert!(!verify_password("anything", &Base64::encode_string(&[1u8; 64])));
    }

    #[test]
    fn constant_time_eq_semantics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
