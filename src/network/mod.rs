pub mod protocol;

use bytes::{Buf, Bytes, BytesMut};
use serde::Serialize;

/// Every message on the stream is terminated by a single NUL byte.
pub const FRAME_DELIMITER: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame exceeds {max} bytes without a terminator")]
    TooLong { max: usize },
}

/// Splits an incoming byte stream on NUL terminators.
///
/// Reads may carry several frames, or stop in the middle of one; partial
/// data stays buffered until its terminator arrives.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_len: usize,
    /// Set after an oversize frame; input is dropped up to its terminator.
    discarding: bool,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
            max_frame_len,
            discarding: false,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete frame without its terminator. Empty frames are skipped.
    ///
    /// When the unterminated tail grows past the limit it is discarded and
    /// [`FrameError::TooLong`] is returned once. The rest of that frame, up to
    /// and including its terminator, is dropped as it arrives.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        loop {
            let delimiter = self.buf.iter().position(|&b| b == FRAME_DELIMITER);

            if self.discarding {
                match delimiter {
                    Some(pos) => {
                        self.buf.advance(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return Ok(None);
                    }
                }
            }

            match delimiter {
                Some(0) => self.buf.advance(1),
                Some(pos) => {
                    let frame = self.buf.split_to(pos);
                    self.buf.advance(1);
                    return Ok(Some(frame.freeze()));
                }
                None if self.buf.len() > self.max_frame_len => {
                    self.buf.clear();
                    self.discarding = true;
                    return Err(FrameError::TooLong { max: self.max_frame_len });
                }
                None => return Ok(None),
            }
        }
    }
}

/// Serialises `msg` to compact JSON followed by the NUL terminator.
pub fn encode_frame<T: Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = serde_json::to_vec(msg)?;
    out.push(FRAME_DELIMITER);
    Ok(out)
}
