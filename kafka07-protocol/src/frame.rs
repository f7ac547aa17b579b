//! Length-prefixed frames.
//!
//! Requests and responses share the same outer framing:
//!
//! ```text
//! +-----------+----------------+
//! |  length   |      body      |
//! |  4 bytes  |  length bytes  |
//! +-----------+----------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_FRAME_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix.
pub const FRAME_HEADER_SIZE: usize = 4;

/// A single request or response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub body: Bytes,
}

impl Frame {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        check_size(self.body.len())?;

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.body.len());
        buf.put_u32(self.body.len() as u32);
        buf.put_slice(&self.body);
        Ok(buf)
    }

    /// Decodes a frame from the front of `buf`.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` if the frame is oversized.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let body_len = Self::body_len([buf[0], buf[1], buf[2], buf[3]])?;
        if buf.len() < FRAME_HEADER_SIZE + body_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let body = buf.split_to(body_len).freeze();
        Ok(Some(Self { body }))
    }

    /// Reads the body length from a frame header.
    pub fn body_len(header: [u8; FRAME_HEADER_SIZE]) -> Result<usize, ProtocolError> {
        let len = u32::from_be_bytes(header) as usize;
        check_size(len)?;
        Ok(len)
    }
}

fn check_size(size: usize) -> Result<(), ProtocolError> {
    if size > MAX_FRAME_SIZE as usize {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}
