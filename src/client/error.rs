//! Session error types.

use thiserror::Error;

use super::identity::AppIdentity;
use super::session::{SessionState, Step};
use crate::core::ErrorKind;
use crate::transport::TransportError;

/// Why a challenge upload stopped.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A chunk could not be sent or its acknowledgment not received.
    #[error("chunk {chunk}: {source}")]
    Transport {
        /// Index of the failed chunk.
        chunk: usize,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The device acknowledged a chunk with a non-OK status.
    #[error("chunk {chunk}: device returned status {status}")]
    Rejected {
        /// Index of the failed chunk.
        chunk: usize,
        /// Status byte from the acknowledgment.
        status: u8,
    },
}

impl UploadError {
    /// Index of the chunk that failed.
    pub fn chunk(&self) -> usize {
        match self {
            UploadError::Transport { chunk, .. } | UploadError::Rejected { chunk, .. } => *chunk,
        }
    }
}

/// Errors that end a key derivation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Frame exchange failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response carried too few bytes for the step.
    #[error("malformed response: need {expected} bytes, got {actual}")]
    MalformedResponse {
        /// Bytes the step needs.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Device refused the announced challenge size.
    #[error("device rejected challenge size {size}")]
    DeviceRejectedSize {
        /// Announced size.
        size: usize,
        /// Status byte, if the response carried one.
        status: Option<u8>,
    },

    /// Challenge upload stopped at a chunk.
    #[error("challenge upload failed: {0}")]
    ChallengeUploadFailed(#[from] UploadError),

    /// Derive response was shorter than a key.
    #[error("derivation incomplete: got {actual} of 64 key bytes")]
    DerivationIncomplete {
        /// Bytes received.
        actual: usize,
    },

    /// Nobody touched the device before the extended deadline.
    #[error("timed out waiting for touch confirmation on the device")]
    TouchTimeout,

    /// Challenge is empty, too large, or differs from the announced size.
    #[error("invalid challenge size {size} (allowed 1..={max})")]
    InvalidChallengeSize {
        /// Offending size.
        size: usize,
        /// Largest size allowed.
        max: usize,
    },

    /// Device runs a different app or version.
    #[error("unexpected device app: {found}")]
    UnexpectedApp {
        /// Identity the device reported.
        found: AppIdentity,
    },

    /// A step was attempted out of order.
    #[error("cannot {step} in state {state:?}")]
    OutOfOrder {
        /// Step attempted.
        step: Step,
        /// State the session was in.
        state: SessionState,
    },
}

impl SessionError {
    /// Flat failure reason.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Transport(e) => e.kind(),
            SessionError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            SessionError::DeviceRejectedSize { .. } => ErrorKind::DeviceRejectedSize,
            SessionError::ChallengeUploadFailed(_) => ErrorKind::ChallengeUploadFailed,
            SessionError::DerivationIncomplete { .. } => ErrorKind::DerivationIncomplete,
            SessionError::TouchTimeout => ErrorKind::TouchTimeout,
            SessionError::InvalidChallengeSize { .. } => ErrorKind::InvalidChallengeSize,
            SessionError::UnexpectedApp { .. } => ErrorKind::UnexpectedApp,
            SessionError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
        }
    }

    /// Check if the failure calls for a "touch the device" hint on retry.
    pub fn needs_touch(&self) -> bool {
        matches!(self, SessionError::TouchTimeout)
    }

    /// Check if the device answered but refused.
    pub fn is_device_error(&self) -> bool {
        match self {
            SessionError::Transport(e) => e.is_device_error(),
            SessionError::DeviceRejectedSize { .. } | SessionError::UnexpectedApp { .. } => true,
            SessionError::ChallengeUploadFailed(UploadError::Rejected { .. }) => true,
            SessionError::ChallengeUploadFailed(UploadError::Transport { source, .. }) => {
                source.is_device_error()
            }
            _ => false,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
