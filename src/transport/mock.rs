//! Scripted in-memory transport.
//!
//! Replies are queued up front; the protocol is strictly request-then-wait,
//! so a queue in request order is enough to stand in for the device. An
//! empty queue behaves like a device that never answers.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use super::frame::Frame;
use super::port::Transport;
use crate::core::ENDPOINT_APP;

/// In-memory [`Transport`] with queued inbound bytes and a record of writes.
#[derive(Debug, Default)]
pub struct MockTransport {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    write_error: Option<io::ErrorKind>,
}

impl MockTransport {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw inbound bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Queue one frame.
    pub fn push_frame(&mut self, frame: Frame) {
        self.push_bytes(&frame.to_bytes());
    }

    /// Queue an OK response from the app endpoint.
    ///
    /// Panics if `data` does not fit in one frame.
    pub fn push_response(&mut self, id: u8, code: u8, data: &[u8]) {
        match Frame::new(id, ENDPOINT_APP, code, data) {
            Ok(frame) => self.push_frame(frame),
            Err(e) => panic!("mock response does not fit a frame: {e}"),
        }
    }

    /// Queue a NOK response.
    pub fn push_nok(&mut self, id: u8) {
        self.push_frame(Frame::nok(id, ENDPOINT_APP));
    }

    /// Make every following write fail with `kind`.
    pub fn fail_writes(&mut self, kind: io::ErrorKind) {
        self.write_error = Some(kind);
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Written bytes parsed back into frames.
    pub fn sent_frames(&self) -> Vec<Frame> {
        Frame::decode_all(&self.written).unwrap_or_default()
    }

    /// Inbound bytes not yet read.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.write_error {
            return Err(io::Error::new(kind, "mock write failure"));
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
