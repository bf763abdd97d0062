//! Key material handling.
//!
//! Both the derived key and the device-equivalent secret are zeroized on drop
//! and never printed by `Debug`.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;
use crate::core::{DERIVED_KEY_SIZE, SECRET_MATERIAL_SIZE};

/// The 64-byte key returned by the device app.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; DERIVED_KEY_SIZE]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy the first 64 bytes of `data`, if there are that many.
    pub fn from_prefix(data: &[u8]) -> Option<Self> {
        let bytes: [u8; DERIVED_KEY_SIZE] = data.get(..DERIVED_KEY_SIZE)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes the unlock key.
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

impl AsRef<[u8]> for DerivedKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The 64-byte secret the device app keys its hash with.
///
/// How the device arrives at this value is its own business; the client only
/// uses it to recompute the expected key for cross-checking.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial([u8; SECRET_MATERIAL_SIZE]);

impl SecretMaterial {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; SECRET_MATERIAL_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; SECRET_MATERIAL_SIZE];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|_| CryptoError::InvalidSecret)?;
        Ok(Self(bytes))
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_MATERIAL_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prefix() {
        let mut data = vec![0u8; 127];
        data[0] = 0xde;
        data[63] = 0xad;
        data[64] = 0xff;
        let key = DerivedKey::from_prefix(&data).unwrap();
        assert_eq!(key.as_bytes()[0], 0xde);
        assert_eq!(key.as_bytes()[63], 0xad);

        assert!(DerivedKey::from_prefix(&[0u8; 63]).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = DerivedKey::from_bytes([0x42; 64]);
        assert_eq!(format!("{key:?}"), "DerivedKey([REDACTED])");
        let secret = SecretMaterial::from_bytes([0x42; 64]);
        assert!(!format!("{secret:?}").contains("42"));
    }

    #[test]
    fn test_hex() {
        let key = DerivedKey::from_bytes([0xab; 64]);
        assert_eq!(key.to_hex(), "ab".repeat(64));

        let secret = SecretMaterial::from_hex(&"0f".repeat(64)).unwrap();
        assert_eq!(secret.as_bytes(), &[0x0f; 64]);

        assert!(matches!(
            SecretMaterial::from_hex("abcd"),
            Err(CryptoError::InvalidSecret)
        ));
        assert!(SecretMaterial::from_hex(&"zz".repeat(64)).is_err());
    }

    #[test]
    fn test_equality() {
        let a = DerivedKey::from_bytes([1; 64]);
        let mut bytes = [1; 64];
        assert_eq!(a, DerivedKey::from_bytes(bytes));
        bytes[63] = 2;
        assert_ne!(a, DerivedKey::from_bytes(bytes));

        // A difference anywhere counts
        for i in [0, 31, 62] {
            let mut bytes = [1; 64];
            bytes[i] ^= 0x80;
            assert_ne!(a, DerivedKey::from_bytes(bytes));
        }
    }
}
