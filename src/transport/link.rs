//! Request/response framing over a [`Transport`].
//!
//! One request is written, then the link blocks for exactly one response
//! frame. Nothing is pipelined: the protocol never has two requests in flight.

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::error::{TransportError, TransportResult};
use super::frame::Frame;
use super::header::FrameHeader;
use super::port::Transport;

/// Frame-level view of a byte transport.
#[derive(Debug)]
pub struct FrameLink<T> {
    transport: T,
}

impl<T: Transport> FrameLink<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send one OK-status frame carrying `code` and `data`.
    ///
    /// Fails with `PayloadTooLarge` when `data` exceeds 127 bytes.
    pub fn send_frame(
        &mut self,
        id: u8,
        endpoint: u8,
        code: u8,
        data: &[u8],
    ) -> TransportResult<()> {
        let frame = Frame::new(id, endpoint, code, data)?;
        let bytes = frame.to_bytes();

        debug!(
            id = frame.header.id,
            endpoint = frame.header.endpoint,
            code = format_args!("{code:#04x}"),
            len = frame.header.length.size(),
            "tx frame"
        );
        trace!(bytes = %hex::encode(&bytes), "tx");

        self.transport.write_all(&bytes)?;
        Ok(())
    }

    /// Wait up to `timeout` for one response frame and return its data block.
    ///
    /// The deadline covers the whole frame, header byte and body together.
    ///
    /// The returned block is still padded to the length class; callers know
    /// the logical length of the step they are running. A frame id other than
    /// `expected_id` is logged and otherwise accepted.
    pub fn recv_frame(
        &mut self,
        expected_id: u8,
        expected_code: u8,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut first = [0u8; 1];
        if self.transport.read_timeout(&mut first, timeout)? == 0 {
            return Err(TransportError::Timeout);
        }
        let header = FrameHeader::from_byte(first[0]);
        let size = header.length.size();

        let mut body = vec![0u8; size];
        let remaining = deadline.saturating_duration_since(Instant::now());
        let got = self.transport.read_timeout(&mut body, remaining)?;
        if got < size {
            return Err(TransportError::ShortFrame {
                expected: size,
                actual: got,
            });
        }

        debug!(
            id = header.id,
            endpoint = header.endpoint,
            status = header.status,
            code = format_args!("{:#04x}", body[0]),
            len = size,
            "rx frame"
        );
        trace!(header = format_args!("{:#04x}", first[0]), body = %hex::encode(&body), "rx");

        if header.id != expected_id & 0x3 {
            warn!(
                expected = expected_id & 0x3,
                actual = header.id,
                "frame id mismatch"
            );
        }

        // NOK frames carry no response code, so the status bit goes first.
        if !header.is_ok() {
            return Err(TransportError::DeviceReportedError);
        }

        if body[0] != expected_code {
            return Err(TransportError::UnexpectedResponseCode {
                expected: expected_code,
                actual: body[0],
            });
        }

        body.remove(0);
        Ok(body)
    }

    /// Send a request and wait for its response in one call.
    pub fn transact(
        &mut self,
        id: u8,
        endpoint: u8,
        (code, data): (u8, &[u8]),
        expected_code: u8,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        self.send_frame(id, endpoint, code, data)?;
        self.recv_frame(id, expected_code, timeout)
    }
}
