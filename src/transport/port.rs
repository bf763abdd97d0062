//! Byte-stream transport abstraction.
//!
//! The framing layer only needs two blocking primitives: write a buffer, and
//! read into a buffer with a deadline. Anything duplex that can do both (a
//! serial line, a socket, a scripted mock) can carry frames.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::{DEFAULT_DEVICE_PATH, DEFAULT_SPEED, SETTLE_DELAY};

/// A blocking, byte-oriented duplex stream with read deadlines.
pub trait Transport {
    /// Write every byte of `bytes` and flush.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read into `buf`, waiting at most `timeout` in total.
    ///
    /// Returns the number of bytes read. A count below `buf.len()` means the
    /// deadline expired or the stream ended first; it is not an error.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read_timeout(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read_timeout(buf, timeout)
    }
}

/// Where and how to open the device's serial line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Device node (e.g. `/dev/ttyACM0`).
    pub path: PathBuf,
    /// Line speed in baud.
    pub speed: u32,
    /// Pause after opening before the first frame is written.
    pub settle_delay: Duration,
    /// Put the line in raw mode at `speed` with `stty` before use.
    pub configure_line: bool,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
            speed: DEFAULT_SPEED,
            settle_delay: SETTLE_DELAY,
            configure_line: true,
        }
    }
}
