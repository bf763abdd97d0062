//! Error types for the TKey-LUKS client.
//!
//! Each layer has its own error enum ([`FrameError`], [`TransportError`],
//! [`SessionError`]); [`TkeyError`] collects them for callers that do not
//! care which layer failed. [`ErrorKind`] flattens the whole taxonomy into
//! a `Copy` discriminant.

use thiserror::Error;

use crate::client::SessionError;
use crate::transport::{FrameError, TransportError};

/// Flat discriminant of every failure reason the protocol can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No header byte arrived before the deadline.
    Timeout,
    /// Frame payload was truncated.
    ShortFrame,
    /// Byte count does not fit any length class.
    InvalidFrameSize,
    /// Header carried a length code outside the four valid classes.
    InvalidLengthCode,
    /// Data block exceeds what a single frame can carry.
    PayloadTooLarge,
    /// Response code byte did not match the request.
    UnexpectedResponseCode,
    /// Device set the header status bit.
    DeviceReportedError,
    /// Response carried too few bytes for the step.
    MalformedResponse,
    /// Device refused the announced challenge size.
    DeviceRejectedSize,
    /// A challenge chunk was not acknowledged.
    ChallengeUploadFailed,
    /// Derive response was shorter than a key.
    DerivationIncomplete,
    /// Nobody touched the device before the extended deadline.
    TouchTimeout,
    /// Challenge is empty or larger than the device buffer.
    InvalidChallengeSize,
    /// Device is running a different app or version.
    UnexpectedApp,
    /// A session step was attempted in the wrong state.
    OutOfOrder,
    /// Configuration was rejected.
    Config,
    /// Underlying I/O failure.
    Io,
}

/// Top-level TKey-LUKS errors.
#[derive(Debug, Error)]
pub enum TkeyError {
    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Transport error outside a session (e.g. while opening the port).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TkeyError {
    /// Flat failure reason.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TkeyError::Session(e) => e.kind(),
            TkeyError::Transport(e) => e.kind(),
            TkeyError::Config(_) => ErrorKind::Config,
            TkeyError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the failure was the operator not touching the device in time.
    pub fn is_touch_timeout(&self) -> bool {
        self.kind() == ErrorKind::TouchTimeout
    }
}

impl From<FrameError> for TkeyError {
    fn from(e: FrameError) -> Self {
        TkeyError::Transport(TransportError::Frame(e))
    }
}

/// Result type for top-level operations.
pub type TkeyResult<T> = Result<T, TkeyError>;
