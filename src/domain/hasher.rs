//! Credential digest helpers.

use sha1::{Digest, Sha1};

/// Hash a credential secret into its storable form: SHA-1, lowercase hex.
///
/// Deterministic and unsalted — the digest is compared byte for byte during
/// authentication. New designs layering on top of this should add
/// per-credential salting; the unsalted form is kept for compatibility with
/// existing credential rows.
#[must_use]
pub fn hash_credential(secret: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(secret);
    hex::encode(hasher.finalize())
}
