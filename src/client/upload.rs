//! Chunked challenge upload.
//!
//! The challenge is cut into 127-byte chunks, each zero-padded to a full
//! 128-byte frame. Chunk frame ids rotate through four slots starting at 3,
//! so consecutive chunks never share an id with their neighbour. Any failed
//! chunk aborts the upload; there is no resume.

use std::time::Duration;

use tracing::{debug, info};

use super::error::UploadError;
use crate::core::{
    CMD_LOAD_CHALLENGE, FRAME_ID_CHUNK_BASE, FRAME_ID_SLOTS, MAX_FRAME_DATA, RSP_LOAD_CHALLENGE,
    STATUS_OK,
};
use crate::transport::{FrameLink, Transport};

/// Frame id for chunk `index` (`3 + index mod 4`, on the 2-bit wire field).
pub fn chunk_frame_id(index: usize) -> u8 {
    let slot = (index % FRAME_ID_SLOTS as usize) as u8;
    (FRAME_ID_CHUNK_BASE + slot) & 0x3
}

/// Sends a challenge over a [`FrameLink`] one acknowledged chunk at a time.
#[derive(Debug)]
pub struct ChunkUploader<'a, T> {
    link: &'a mut FrameLink<T>,
    endpoint: u8,
    timeout: Duration,
}

impl<'a, T: Transport> ChunkUploader<'a, T> {
    /// Uploader over `link`, waiting `timeout` for each acknowledgment.
    pub fn new(link: &'a mut FrameLink<T>, endpoint: u8, timeout: Duration) -> Self {
        Self {
            link,
            endpoint,
            timeout,
        }
    }

    /// Upload the whole challenge; returns the number of bytes sent.
    pub fn upload(&mut self, challenge: &[u8]) -> Result<usize, UploadError> {
        let mut sent = 0;
        for (index, chunk) in challenge.chunks(MAX_FRAME_DATA).enumerate() {
            self.send_chunk(index, chunk_frame_id(index), chunk)?;
            sent += chunk.len();
            info!(
                loaded = sent,
                total = challenge.len(),
                "loaded challenge chunk"
            );
        }
        Ok(sent)
    }

    /// Send one chunk under frame id `id` and check its acknowledgment.
    fn send_chunk(&mut self, index: usize, id: u8, chunk: &[u8]) -> Result<(), UploadError> {
        let mut data = [0u8; MAX_FRAME_DATA];
        data[..chunk.len()].copy_from_slice(chunk);
        debug!(chunk = index, id, len = chunk.len(), "sending challenge chunk");

        let ack = self
            .link
            .transact(
                id,
                self.endpoint,
                (CMD_LOAD_CHALLENGE, &data[..]),
                RSP_LOAD_CHALLENGE,
                self.timeout,
            )
            .map_err(|source| UploadError::Transport {
                chunk: index,
                source,
            })?;

        match ack.first() {
            Some(&STATUS_OK) => Ok(()),
            status => Err(UploadError::Rejected {
                chunk: index,
                status: status.copied().unwrap_or(u8::MAX),
            }),
        }
    }
}
