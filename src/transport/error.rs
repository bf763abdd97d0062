//! Transport layer error types.

use std::io;

use thiserror::Error;

use crate::core::ErrorKind;

/// Frame sizing errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Byte count does not fit the largest length class.
    #[error("invalid frame size: {0} bytes (max 128)")]
    InvalidFrameSize(usize),

    /// Length code outside the four valid classes.
    #[error("invalid length code: {0:#04x}")]
    InvalidLengthCode(u8),

    /// Data block too large for a single frame.
    #[error("payload too large: {0} bytes (max 127)")]
    PayloadTooLarge(usize),
}

impl FrameError {
    /// Flat failure reason.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameError::InvalidFrameSize(_) => ErrorKind::InvalidFrameSize,
            FrameError::InvalidLengthCode(_) => ErrorKind::InvalidLengthCode,
            FrameError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
        }
    }
}

/// Errors from sending or receiving one frame.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Frame sizing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// I/O error on the underlying stream.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// No header byte arrived before the deadline.
    #[error("timed out waiting for response")]
    Timeout,

    /// Fewer payload bytes than the header's length class.
    #[error("short frame: expected {expected} bytes, got {actual}")]
    ShortFrame {
        /// Bytes declared by the length class.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Response code does not answer the request.
    #[error("unexpected response code {actual:#04x} (expected {expected:#04x})")]
    UnexpectedResponseCode {
        /// Response code the request calls for.
        expected: u8,
        /// Response code on the wire.
        actual: u8,
    },

    /// Device set the status bit in the frame header.
    #[error("device reported error status")]
    DeviceReportedError,
}

impl TransportError {
    /// Flat failure reason.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Frame(e) => e.kind(),
            TransportError::Io(_) => ErrorKind::Io,
            TransportError::Timeout => ErrorKind::Timeout,
            TransportError::ShortFrame { .. } => ErrorKind::ShortFrame,
            TransportError::UnexpectedResponseCode { .. } => ErrorKind::UnexpectedResponseCode,
            TransportError::DeviceReportedError => ErrorKind::DeviceReportedError,
        }
    }

    /// Check if the device never answered in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }

    /// Check if the device answered but refused the request.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            TransportError::DeviceReportedError | TransportError::UnexpectedResponseCode { .. }
        )
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_errors() {
        assert!(TransportError::Timeout.is_timeout());
        assert!(!TransportError::ShortFrame { expected: 4, actual: 1 }.is_timeout());
        assert!(!TransportError::Io(io::Error::new(io::ErrorKind::Other, "test")).is_timeout());
    }

    #[test]
    fn test_device_errors() {
        assert!(TransportError::DeviceReportedError.is_device_error());
        assert!(
            TransportError::UnexpectedResponseCode {
                expected: 0x04,
                actual: 0x00
            }
            .is_device_error()
        );
        assert!(!TransportError::Timeout.is_device_error());
    }

    #[test]
    fn test_frame_error_kind() {
        let err = TransportError::from(FrameError::PayloadTooLarge(200));
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        assert_eq!(
            FrameError::InvalidFrameSize(129).to_string(),
            "invalid frame size: 129 bytes (max 128)"
        );
    }
}
