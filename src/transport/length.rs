//! Frame length classes.
//!
//! Every frame body (command code + data) is one of four fixed sizes. The
//! class is never negotiated; it is computed from the body size.

use super::error::FrameError;

/// One of the four frame body sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LengthClass {
    /// 1-byte body (`LEN_1`).
    Len1 = 0x00,
    /// 4-byte body (`LEN_4`).
    Len4 = 0x01,
    /// 32-byte body (`LEN_32`).
    Len32 = 0x02,
    /// 128-byte body (`LEN_128`).
    Len128 = 0x03,
}

impl LengthClass {
    /// All classes in ascending size order.
    pub const ALL: [LengthClass; 4] = [
        LengthClass::Len1,
        LengthClass::Len4,
        LengthClass::Len32,
        LengthClass::Len128,
    ];

    /// Smallest class that holds `n` bytes.
    pub fn for_size(n: usize) -> Result<Self, FrameError> {
        Self::ALL
            .into_iter()
            .find(|class| class.size() >= n)
            .ok_or(FrameError::InvalidFrameSize(n))
    }

    /// Parse a 2-bit length code.
    pub fn from_code(code: u8) -> Result<Self, FrameError> {
        match code {
            0x00 => Ok(Self::Len1),
            0x01 => Ok(Self::Len4),
            0x02 => Ok(Self::Len32),
            0x03 => Ok(Self::Len128),
            _ => Err(FrameError::InvalidLengthCode(code)),
        }
    }

    /// Parse the low two bits of `code`; total.
    pub(crate) fn from_code_masked(code: u8) -> Self {
        match code & 0x3 {
            0x00 => Self::Len1,
            0x01 => Self::Len4,
            0x02 => Self::Len32,
            _ => Self::Len128,
        }
    }

    /// Wire code of this class.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Body size in bytes, including the command/response code byte.
    pub fn size(self) -> usize {
        match self {
            Self::Len1 => 1,
            Self::Len4 => 4,
            Self::Len32 => 32,
            Self::Len128 => 128,
        }
    }
}

/// Map a body byte count to its length code.
pub fn size_to_class(n: usize) -> Result<u8, FrameError> {
    LengthClass::for_size(n).map(LengthClass::code)
}

/// Map a length code to its body byte count.
pub fn class_to_size(code: u8) -> Result<usize, FrameError> {
    LengthClass::from_code(code).map(LengthClass::size)
}
