//! # TKey-LUKS
//!
//! Host side of the TKey challenge/response key derivation app used to
//! unlock LUKS volumes.
//!
//! A session talks to the app over the TKey's serial line in four strictly
//! ordered steps:
//!
//! 1. **Identify**: read the app's name and version
//! 2. **Announce**: tell the app how long the challenge is
//! 3. **Load**: upload the challenge in acknowledged 127-byte chunks
//! 4. **Derive**: wait for a physical touch, then receive a 64-byte key
//!
//! On the device the key is a BLAKE2b-512 keyed hash of the challenge. The
//! same computation is available host-side in [`crypto::derive_reference`]
//! for testing against known secret material.
//!
//! ## Feature Flags
//!
//! - `serial` (default, Unix): [`transport::SerialTransport`] for the device
//!   node and [`transport::detect_port`] to find it
//! - `crypto` (default): host-side reference derivation (BLAKE2b)
//! - `cli`: the `tkey-luks` command-line tool
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included)
//! - [`transport`]: frame codec, frame link, transports
//! - [`crypto`]: key containers, reference derivation, key file sinks
//! - [`client`]: session state machine and client API
//!
//! ## Example Usage
//!
//! ```rust
//! use tkey_luks::prelude::*;
//!
//! // Stand-in device: identify, accept size, ack one chunk, return a key
//! let mut device = MockTransport::new();
//! device.push_response(1, RSP_GET_NAMEVERSION, &AppIdentity::LUKS.to_bytes());
//! device.push_response(2, RSP_SET_CHALLENGE, &[STATUS_OK]);
//! device.push_response(3, RSP_LOAD_CHALLENGE, &[STATUS_OK]);
//! device.push_response(0, RSP_DERIVE_KEY, &[0x42; 64]);
//!
//! let mut client = TkeyClient::new(device, SessionConfig::default());
//! let key = client.derive_key(b"my-system-id").unwrap();
//! assert_eq!(key.as_bytes(), &[0x42; 64]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer
pub mod transport;

// Key material
pub mod crypto;

// Client API
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Constants and errors
    pub use crate::core::*;

    // Transport types
    pub use crate::transport::{
        Frame, FrameError, FrameHeader, FrameLink, LengthClass, MockTransport, PortSettings,
        Transport, TransportError, TransportResult,
    };

    #[cfg(all(feature = "serial", unix))]
    pub use crate::transport::SerialTransport;

    // Key material
    pub use crate::crypto::{CryptoError, DerivedKey, KeyFiles, SecretMaterial};

    #[cfg(feature = "crypto")]
    pub use crate::crypto::derive_reference;

    // Client API
    pub use crate::client::{
        AppIdentity, ClientConfig, ClientConfigBuilder, DeriveSession, SessionConfig,
        SessionError, SessionState, TkeyClient,
    };
}

// Re-export commonly used items at crate root
pub use core::{ErrorKind, TkeyError, TkeyResult};

pub use client::{ClientConfig, ClientConfigBuilder, SessionConfig, TkeyClient};
pub use crypto::DerivedKey;
