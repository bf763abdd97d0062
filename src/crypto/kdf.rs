//! Reference key derivation.
//!
//! Recomputes what the device app returns for a challenge:
//! BLAKE2b-512 in keyed mode, keyed with the 64-byte secret, personalized
//! with `"tkey-luks"` and an empty salt.

use blake2::Blake2bMac512;
use blake2::digest::Mac;

use super::CryptoError;
use super::keys::{DerivedKey, SecretMaterial};
use crate::core::{DERIVED_KEY_SIZE, KDF_PERSONALIZATION};

/// Derive the 64-byte key for `challenge` from `secret`.
///
/// Deterministic: the same inputs always give the same key.
pub fn derive_reference(
    secret: &SecretMaterial,
    challenge: &[u8],
) -> Result<DerivedKey, CryptoError> {
    let mut mac =
        Blake2bMac512::new_with_salt_and_personal(secret.as_bytes(), &[], KDF_PERSONALIZATION)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;
    mac.update(challenge);

    let mut out = [0u8; DERIVED_KEY_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(DerivedKey::from_bytes(out))
}

impl DerivedKey {
    /// Check this key against the reference derivation.
    pub fn matches_reference(
        &self,
        secret: &SecretMaterial,
        challenge: &[u8],
    ) -> Result<bool, CryptoError> {
        Ok(derive_reference(secret, challenge)? == *self)
    }
}
