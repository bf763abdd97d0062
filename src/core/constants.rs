//! Protocol constants for the TKey framing protocol and the LUKS device app.
//!
//! These values are fixed by the device firmware and app and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// FRAMING (tkey-libs proto.h)
// =============================================================================

/// Destination endpoint for the loaded device application (`DST_SW`).
pub const ENDPOINT_APP: u8 = 0x03;

/// Largest frame body (command code + data) the device accepts.
pub const MAX_FRAME_BODY: usize = 128;

/// Largest data block that fits in one frame after the command code.
pub const MAX_FRAME_DATA: usize = MAX_FRAME_BODY - 1;

/// Header status bit value for a successful frame.
pub const FRAME_STATUS_OK: u8 = 0;

/// Header status bit value for a rejected frame.
pub const FRAME_STATUS_NOK: u8 = 1;

// =============================================================================
// APP COMMAND CODES (app_proto.h)
// =============================================================================

/// Announce the challenge size.
pub const CMD_SET_CHALLENGE: u8 = 0x03;

/// Acknowledgment of the challenge size.
pub const RSP_SET_CHALLENGE: u8 = 0x04;

/// Load one chunk of challenge data.
pub const CMD_LOAD_CHALLENGE: u8 = 0x05;

/// Acknowledgment of one challenge chunk.
pub const RSP_LOAD_CHALLENGE: u8 = 0x06;

/// Request key derivation over the loaded challenge.
pub const CMD_DERIVE_KEY: u8 = 0x07;

/// Derived key response.
pub const RSP_DERIVE_KEY: u8 = 0x08;

/// Request app name and version.
pub const CMD_GET_NAMEVERSION: u8 = 0x09;

/// App name and version response.
pub const RSP_GET_NAMEVERSION: u8 = 0x0a;

// =============================================================================
// ACKNOWLEDGMENT STATUS (app payload byte 0)
// =============================================================================

/// Acknowledgment payload status: accepted.
pub const STATUS_OK: u8 = 0;

/// Acknowledgment payload status: rejected.
pub const STATUS_BAD: u8 = 1;

// =============================================================================
// FRAME IDS
// =============================================================================

/// Frame id used for the derive command.
pub const FRAME_ID_DERIVE: u8 = 0;

/// Frame id used for the identify command.
pub const FRAME_ID_IDENTIFY: u8 = 1;

/// Frame id used for the size announcement.
pub const FRAME_ID_ANNOUNCE: u8 = 2;

/// First frame id of the challenge chunk rotation.
pub const FRAME_ID_CHUNK_BASE: u8 = 3;

/// Number of slots in the chunk frame id rotation.
pub const FRAME_ID_SLOTS: u8 = 4;

// =============================================================================
// PAYLOAD SIZES
// =============================================================================

/// Size of the derived key returned by the device.
pub const DERIVED_KEY_SIZE: usize = 64;

/// Size of the device-held secret key material.
pub const SECRET_MATERIAL_SIZE: usize = 64;

/// Size of the size-announcement data block (u32 LE + zero padding).
pub const ANNOUNCE_DATA_SIZE: usize = 31;

/// Bytes needed to decode an identity response (two tags + u32 version).
pub const IDENTITY_RESPONSE_SIZE: usize = 12;

/// Largest challenge the device app can buffer.
pub const MAX_CHALLENGE_SIZE: usize = 256;

/// Personalization tag of the keyed hash.
pub const KDF_PERSONALIZATION: &[u8; 9] = b"tkey-luks";

// =============================================================================
// EXPECTED APP IDENTITY
// =============================================================================

/// First name tag reported by the LUKS device app.
pub const APP_NAME0: [u8; 4] = *b"tk1 ";

/// Second name tag reported by the LUKS device app.
pub const APP_NAME1: [u8; 4] = *b"luks";

/// App version this client speaks.
pub const APP_VERSION: u32 = 1;

// =============================================================================
// TRANSPORT PARAMETERS
// =============================================================================

/// Default serial device node.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyACM0";

/// USB vendor id of the TKey's serial interface.
pub const TKEY_USB_VID: u16 = 0x1207;

/// USB product id of the TKey's serial interface.
pub const TKEY_USB_PID: u16 = 0x8887;

/// Default line speed in baud.
pub const DEFAULT_SPEED: u32 = 62_500;

/// Delay after opening the port before the first frame.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Response timeout for ordinary steps.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Response timeout for the derive step, which waits on a physical touch.
pub const TOUCH_TIMEOUT: Duration = Duration::from_secs(35);
