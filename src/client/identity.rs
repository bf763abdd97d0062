//! Device app identity (name tags and version).

use std::fmt;

use crate::core::{APP_NAME0, APP_NAME1, APP_VERSION, IDENTITY_RESPONSE_SIZE};

/// Name and version reported by a device app.
///
/// Wire format (first 12 bytes of the response data):
/// ```text
/// +---------+---------+-----------------+
/// | name0   | name1   | version (LE32)  |
/// | 4 bytes | 4 bytes | 4 bytes         |
/// +---------+---------+-----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppIdentity {
    /// First name tag.
    pub name0: [u8; 4],
    /// Second name tag.
    pub name1: [u8; 4],
    /// App version.
    pub version: u32,
}

impl AppIdentity {
    /// The LUKS key derivation app this client speaks to.
    pub const LUKS: Self = Self {
        name0: APP_NAME0,
        name1: APP_NAME1,
        version: APP_VERSION,
    };

    /// Decode from response data; `None` if fewer than 12 bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let bytes: &[u8; IDENTITY_RESPONSE_SIZE] =
            data.get(..IDENTITY_RESPONSE_SIZE)?.try_into().ok()?;
        let mut name0 = [0u8; 4];
        let mut name1 = [0u8; 4];
        let mut version = [0u8; 4];
        name0.copy_from_slice(&bytes[0..4]);
        name1.copy_from_slice(&bytes[4..8]);
        version.copy_from_slice(&bytes[8..12]);

        Some(Self {
            name0,
            name1,
            version: u32::from_le_bytes(version),
        })
    }

    /// Encode to the 12-byte wire form.
    pub fn to_bytes(&self) -> [u8; IDENTITY_RESPONSE_SIZE] {
        let mut buf = [0u8; IDENTITY_RESPONSE_SIZE];
        buf[0..4].copy_from_slice(&self.name0);
        buf[4..8].copy_from_slice(&self.name1);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf
    }

    /// Both name tags as text.
    pub fn name(&self) -> String {
        let mut name = String::from_utf8_lossy(&self.name0).into_owned();
        name.push_str(&String::from_utf8_lossy(&self.name1));
        name
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name(), self.version)
    }
}
