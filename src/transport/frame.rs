//! Frame encoding and decoding.
//!
//! Wire format:
//! ```text
//! +--------+--------+--------------------------------------+
//! | Header | Code   | Data (zero-padded)                   |
//! | 1 byte | 1 byte | class size - 1 bytes                 |
//! +--------+--------+--------------------------------------+
//! ```
//!
//! The data block on the wire is always as long as the header's length class
//! says, whatever the logical content length. The step that produced a frame
//! has to track its logical length itself.

use super::error::{FrameError, TransportError, TransportResult};
use super::header::FrameHeader;
use super::length::LengthClass;
use crate::core::{FRAME_STATUS_NOK, FRAME_STATUS_OK, MAX_FRAME_DATA};

/// One frame: header, command/response code and padded data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Command or response code.
    pub code: u8,
    /// Data block, exactly `header.length.size() - 1` bytes.
    pub data: Vec<u8>,
}

impl Frame {
    /// Build an OK frame, choosing the smallest class that fits `1 + data.len()`.
    pub fn new(id: u8, endpoint: u8, code: u8, data: &[u8]) -> Result<Self, FrameError> {
        Self::with_status(id, endpoint, FRAME_STATUS_OK, code, data)
    }

    /// Build a frame with an explicit status bit.
    pub fn with_status(
        id: u8,
        endpoint: u8,
        status: u8,
        code: u8,
        data: &[u8],
    ) -> Result<Self, FrameError> {
        if data.len() > MAX_FRAME_DATA {
            return Err(FrameError::PayloadTooLarge(data.len()));
        }
        let length = LengthClass::for_size(1 + data.len())?;
        let mut padded = vec![0u8; length.size() - 1];
        padded[..data.len()].copy_from_slice(data);

        Ok(Self {
            header: FrameHeader::new(id, endpoint, status, length),
            code,
            data: padded,
        })
    }

    /// Shortest possible NOK frame, as the device sends on rejection.
    pub fn nok(id: u8, endpoint: u8) -> Self {
        Self {
            header: FrameHeader::new(id, endpoint, FRAME_STATUS_NOK, LengthClass::Len1),
            code: 0,
            data: Vec::new(),
        }
    }

    /// Total bytes on the wire (header + class size).
    pub fn wire_len(&self) -> usize {
        1 + self.header.length.size()
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        buf.push(self.header.to_byte());
        buf.push(self.code);
        buf.extend_from_slice(&self.data);
        buf.resize(self.wire_len(), 0);
        buf
    }

    /// Parse one frame from the front of `bytes`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> TransportResult<(Self, usize)> {
        let (&first, rest) = bytes.split_first().ok_or(TransportError::Timeout)?;
        let header = FrameHeader::from_byte(first);
        let size = header.length.size();
        if rest.len() < size {
            return Err(TransportError::ShortFrame {
                expected: size,
                actual: rest.len(),
            });
        }

        let frame = Self {
            header,
            code: rest[0],
            data: rest[1..size].to_vec(),
        };
        Ok((frame, 1 + size))
    }

    /// Parse every frame in `bytes`, back to back.
    pub fn decode_all(mut bytes: &[u8]) -> TransportResult<Vec<Self>> {
        let mut frames = Vec::new();
        while !bytes.is_empty() {
            let (frame, used) = Self::decode(bytes)?;
            frames.push(frame);
            bytes = &bytes[used..];
        }
        Ok(frames)
    }
}
