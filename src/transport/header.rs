//! Single-byte frame header codec.
//!
//! Wire format (1 byte):
//! ```text
//! +--------+--------+----------+--------+--------+
//! | bit 7  | 6..5   | 4..3     | 2      | 1..0   |
//! +--------+--------+----------+--------+--------+
//! | unused | id     | endpoint | status | length |
//! +--------+--------+----------+--------+--------+
//! ```
//!
//! Fields wider than their slot are masked silently, mirroring the
//! fixed-width wire layout.

use super::length::LengthClass;

const ID_MASK: u8 = 0x3;
const ENDPOINT_MASK: u8 = 0x3;
const STATUS_MASK: u8 = 0x1;
const LENGTH_MASK: u8 = 0x3;

const ID_SHIFT: u8 = 5;
const ENDPOINT_SHIFT: u8 = 3;
const STATUS_SHIFT: u8 = 2;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Frame id (2 bits).
    pub id: u8,
    /// Destination or source endpoint (2 bits).
    pub endpoint: u8,
    /// Status bit: 0 = OK, 1 = NOK.
    pub status: u8,
    /// Length class of the frame body.
    pub length: LengthClass,
}

impl FrameHeader {
    /// Create a header, masking every field to its bit width.
    pub fn new(id: u8, endpoint: u8, status: u8, length: LengthClass) -> Self {
        Self {
            id: id & ID_MASK,
            endpoint: endpoint & ENDPOINT_MASK,
            status: status & STATUS_MASK,
            length,
        }
    }

    /// Pack into the wire byte.
    pub fn to_byte(self) -> u8 {
        encode(self.id, self.endpoint, self.status, self.length.code())
    }

    /// Unpack a wire byte. Never fails: every byte decodes to some header.
    pub fn from_byte(byte: u8) -> Self {
        let (id, endpoint, status, code) = decode(byte);
        Self {
            id,
            endpoint,
            status,
            length: LengthClass::from_code_masked(code),
        }
    }

    /// Check the status bit.
    pub fn is_ok(self) -> bool {
        self.status == 0
    }
}

/// Pack raw header fields into one byte.
pub fn encode(id: u8, endpoint: u8, status: u8, length_code: u8) -> u8 {
    ((id & ID_MASK) << ID_SHIFT)
        | ((endpoint & ENDPOINT_MASK) << ENDPOINT_SHIFT)
        | ((status & STATUS_MASK) << STATUS_SHIFT)
        | (length_code & LENGTH_MASK)
}

/// Unpack one byte into `(id, endpoint, status, length_code)`.
pub fn decode(byte: u8) -> (u8, u8, u8, u8) {
    (
        (byte >> ID_SHIFT) & ID_MASK,
        (byte >> ENDPOINT_SHIFT) & ENDPOINT_MASK,
        (byte >> STATUS_SHIFT) & STATUS_MASK,
        byte & LENGTH_MASK,
    )
}
