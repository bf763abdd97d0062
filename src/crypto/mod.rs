//! TKey-LUKS - Key Material
//!
//! - [`DerivedKey`] and [`SecretMaterial`]: zeroizing key containers
//! - [`derive_reference`]: host-side recomputation of the device's keyed hash
//!   (requires the `crypto` feature)
//! - [`KeyFiles`] and [`write_raw`]: output sinks for a derived key

#[cfg(feature = "crypto")]
mod kdf;
mod keys;
mod sink;

use thiserror::Error;

#[cfg(feature = "crypto")]
pub use kdf::derive_reference;
pub use keys::{DerivedKey, SecretMaterial};
pub use sink::{KeyFiles, write_raw};

/// Errors in key handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Secret material is not 128 hex characters.
    #[error("secret material must be 64 bytes of hex")]
    InvalidSecret,

    /// Keyed hash could not be set up.
    #[error("key derivation failed")]
    KeyDerivationFailed,
}
