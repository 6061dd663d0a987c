//! One-way deterministic credential hashing (`spec.md` §4.9 "account
//! creation/login"). The teacher's own crypto module (`lib/flux/src/crypto.rs`)
//! wraps libsodium AEAD for encrypting connection tokens exchanged with a
//! separate authenticator service, a different problem than hashing a
//! password for at-rest storage, so this hashes with `blake3` instead,
//! the way `Jupeyy-dd-pg`'s `lib/base` crate does for its own credential
//! digests.

const SALT_LEN: usize = 16;

/// Hashes `password` with a random salt and returns `salt_hex:hash_hex`,
/// the value stored under an `account:*` key.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    getrandom(&mut salt);
    let digest = digest_with_salt(password, &salt);
    format!("{}:{}", hex::encode(salt), hex::encode(digest.as_bytes()))
}

/// Verifies `password` against a `salt_hex:hash_hex` value produced by
/// [`hash_password`]. Returns `false` on any malformed stored value
/// rather than erroring, since that only happens for corrupted data.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };
    let digest = digest_with_salt(password, &salt);
    digest.as_bytes().as_slice() == expected.as_slice()
}

fn digest_with_salt(password: &str, salt: &[u8]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

fn getrandom(out: &mut [u8]) {
    use rand::RngCore;
    rand::thread_rng().fill_bytes(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_correct_password() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
    }

    #[test]
    fn rejects_wrong_password() {
        let stored = hash_password("hunter2");
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn two_hashes_of_same_password_differ_by_salt() {
        let a = hash_password("hunter2");
        let b = hash_password("hunter2");
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_value_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-valid-stored-value"));
    }
}
