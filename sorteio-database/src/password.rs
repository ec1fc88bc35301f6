use core::fmt::{self, Debug};

use rand::{thread_rng, Rng as _};
use sha2::{Digest as _, Sha256};

const SALT_LEN: usize = 16;

/// Salted SHA-256 of an organizer password. The plain secret is never kept.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: [u8; SALT_LEN],
    digest: [u8; 32],
}

impl PasswordHash {
    #[must_use]
    pub fn new(password: &str) -> Self {
        let mut salt = [0; SALT_LEN];
        thread_rng().fill(&mut salt);
        Self {
            salt,
            digest: digest(&salt, password),
        }
    }

    /// A hash no password matches, for accounts nobody may log in to.
    #[must_use]
    pub const fn locked() -> Self {
        Self {
            salt: [0; SALT_LEN],
            digest: [0; 32],
        }
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        // compare every byte so timing does not leak the matching prefix
        digest(&self.salt, password)
            .iter()
            .zip(self.digest.iter())
            .fold(0, |acc, (left, right)| acc | (left ^ right))
            == 0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

fn digest(salt: &[u8; SALT_LEN], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}
