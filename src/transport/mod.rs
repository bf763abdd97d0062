//! TKey-LUKS - Transport Layer
//!
//! Everything between a byte stream and a decoded response:
//!
//! - **Header codec**: [`FrameHeader`], [`encode`]/[`decode`] of the 1-byte header
//! - **Length classes**: [`LengthClass`], [`size_to_class`]/[`class_to_size`]
//! - **Frames**: [`Frame`] construction, padding and parsing
//! - **Frame link**: [`FrameLink`] request/response exchange with deadlines
//! - **Byte transports**: the [`Transport`] trait, [`SerialTransport`] for
//!   the device node and [`MockTransport`] for tests
//! - **Port detection**: [`detect_port`] finds the TKey's node by USB id
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Client (session, uploader)       │
//! ├─────────────────────────────────────────┤
//! │        FrameLink                        │  ← This module
//! │   header codec, length classes          │
//! ├─────────────────────────────────────────┤
//! │        Transport (serial / mock)        │
//! └─────────────────────────────────────────┘
//! ```

#[cfg(all(feature = "serial", unix))]
mod detect;
mod error;
mod frame;
mod header;
mod length;
mod link;
mod mock;
mod port;
#[cfg(all(feature = "serial", unix))]
mod serial;

#[cfg(all(feature = "serial", unix))]
pub use detect::{DetectError, detect_port, detect_port_in};
pub use error::*;
pub use frame::Frame;
pub use header::{FrameHeader, decode, encode};
pub use length::{LengthClass, class_to_size, size_to_class};
pub use link::FrameLink;
pub use mock::MockTransport;
pub use port::{PortSettings, Transport};
#[cfg(all(feature = "serial", unix))]
pub use serial::SerialTransport;
