//! Message envelope.
//!
//! Message layout (length prefix + header + payload):
//!
//! ```text
//! version 0:
//! +-----------+--------+----------+-----------------+
//! |  length   | magic  | checksum |     payload     |
//! |  4 bytes  | 1 byte | 4 bytes  | length - 5      |
//! +-----------+--------+----------+-----------------+
//!
//! version 1:
//! +-----------+--------+------------+----------+-----------------+
//! |  length   | magic  | attributes | checksum |     payload     |
//! |  4 bytes  | 1 byte |   1 byte   | 4 bytes  | length - 6      |
//! +-----------+--------+------------+----------+-----------------+
//! ```
//!
//! `length` counts every byte after itself. The checksum is the CRC32 of the
//! payload exactly as it appears on the wire (compressed, if compressed).

use crate::compression::Compression;
use crate::error::ProtocolError;
use crate::MAX_FRAME_SIZE;
use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;

/// Size of the length prefix.
pub const LENGTH_SIZE: usize = 4;

/// Magic byte of the first message format, which has no attributes.
pub const MAGIC_V0: u8 = 0;

/// Magic byte of the format carrying an attributes byte.
pub const MAGIC_V1: u8 = 1;

/// Length prefix plus magic: enough to tell how the rest must be read.
pub const MIN_HEADER_SIZE: usize = LENGTH_SIZE + 1;

/// CRC32 (IEEE) as used for message checksums.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Version-tagged message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageHeader {
    V0 { checksum: u32 },
    V1 { attributes: u8, checksum: u32 },
}

impl MessageHeader {
    pub fn magic(&self) -> u8 {
        match self {
            MessageHeader::V0 { .. } => MAGIC_V0,
            MessageHeader::V1 { .. } => MAGIC_V1,
        }
    }

    pub fn checksum(&self) -> u32 {
        match self {
            MessageHeader::V0 { checksum } | MessageHeader::V1 { checksum, .. } => *checksum,
        }
    }

    pub fn attributes(&self) -> u8 {
        match self {
            MessageHeader::V0 { .. } => 0,
            MessageHeader::V1 { attributes, .. } => *attributes,
        }
    }

    /// Codec of the payload that follows this header.
    pub fn compression(&self) -> Result<Compression, ProtocolError> {
        match self {
            MessageHeader::V0 { .. } => Ok(Compression::None),
            MessageHeader::V1 { attributes, .. } => Compression::from_attributes(*attributes),
        }
    }

    /// Bytes between the length prefix and the payload.
    pub fn size(&self) -> usize {
        Self::size_for_magic(self.magic()).unwrap_or(0)
    }

    fn size_for_magic(magic: u8) -> Option<usize> {
        match magic {
            MAGIC_V0 => Some(5),
            MAGIC_V1 => Some(6),
            _ => None,
        }
    }
}

/// A single message.
///
/// Messages built in memory carry the checksum of their payload. Parsed messages
/// keep the checksum read from the wire; use [`Message::is_valid`] to check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Bytes,
}

impl Message {
    /// Creates a version-0 message with a computed checksum.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: MessageHeader::V0 {
                checksum: crc32(&payload),
            },
            payload,
        }
    }

    /// Creates an uncompressed message with the given magic byte.
    pub fn with_magic(payload: impl Into<Bytes>, magic: u8) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        let checksum = crc32(&payload);
        let header = match magic {
            MAGIC_V0 => MessageHeader::V0 { checksum },
            MAGIC_V1 => MessageHeader::V1 {
                attributes: 0,
                checksum,
            },
            other => return Err(ProtocolError::UnsupportedMagic(other)),
        };
        Ok(Self { header, payload })
    }

    /// Creates a message from a header and payload without touching the checksum.
    pub fn from_parts(header: MessageHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    pub fn magic(&self) -> u8 {
        self.header.magic()
    }

    pub fn checksum(&self) -> u32 {
        self.header.checksum()
    }

    pub fn compression(&self) -> Result<Compression, ProtocolError> {
        self.header.compression()
    }

    /// Returns whether the stored checksum matches the payload.
    pub fn is_valid(&self) -> bool {
        self.checksum() == crc32(&self.payload)
    }

    /// Encodes the message, compressing the payload with `compression`.
    ///
    /// Uncompressed messages are written as version 0, compressed ones as
    /// version 1 with the codec in the attributes byte. The checksum is always
    /// computed over the bytes written.
    pub fn encode(&self, compression: Compression) -> Result<BytesMut, ProtocolError> {
        if !compression.is_available() {
            return Err(ProtocolError::CapabilityUnavailable(compression));
        }

        let payload: Cow<'_, [u8]> = if compression.is_compressed() {
            Cow::Owned(compression.compress(&self.payload)?)
        } else {
            Cow::Borrowed(&self.payload[..])
        };

        let checksum = crc32(&payload);
        let header = if compression.is_compressed() {
            MessageHeader::V1 {
                attributes: compression.attributes(),
                checksum,
            }
        } else {
            MessageHeader::V0 { checksum }
        };

        encode_parts(&header, &payload)
    }

    /// Decodes exactly one message from the front of `buf`.
    ///
    /// Compressed payloads are returned as-is; see
    /// [`MessageSet::parse`](crate::MessageSet::parse) for expansion.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < MIN_HEADER_SIZE {
            return Err(ProtocolError::IncompleteMessage {
                needed: MIN_HEADER_SIZE - buf.len(),
            });
        }

        let length = read_u32(buf, 0);
        let magic = buf[LENGTH_SIZE];
        let header_size =
            MessageHeader::size_for_magic(magic).ok_or(ProtocolError::UnsupportedMagic(magic))?;

        if (length as usize) < header_size {
            return Err(ProtocolError::InvalidMessageLength {
                length,
                magic,
                min: header_size as u32,
            });
        }

        let total_len = LENGTH_SIZE + length as usize;
        if buf.len() < total_len {
            return Err(ProtocolError::IncompleteMessage {
                needed: total_len - buf.len(),
            });
        }

        let header = match magic {
            MAGIC_V0 => MessageHeader::V0 {
                checksum: read_u32(buf, 5),
            },
            _ => MessageHeader::V1 {
                attributes: buf[5],
                checksum: read_u32(buf, 6),
            },
        };

        let payload = Bytes::copy_from_slice(&buf[LENGTH_SIZE + header_size..total_len]);
        Ok(Self { header, payload })
    }
}

impl From<Bytes> for Message {
    fn from(payload: Bytes) -> Self {
        Message::new(payload)
    }
}

impl From<Vec<u8>> for Message {
    fn from(payload: Vec<u8>) -> Self {
        Message::new(payload)
    }
}

impl From<String> for Message {
    fn from(payload: String) -> Self {
        Message::new(payload)
    }
}

impl From<&'static str> for Message {
    fn from(payload: &'static str) -> Self {
        Message::new(payload)
    }
}

impl From<&'static [u8]> for Message {
    fn from(payload: &'static [u8]) -> Self {
        Message::new(payload)
    }
}

fn encode_parts(header: &MessageHeader, payload: &[u8]) -> Result<BytesMut, ProtocolError> {
    let length = header.size() + payload.len();
    if length > MAX_FRAME_SIZE as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LENGTH_SIZE + length);
    buf.put_u32(length as u32);
    buf.put_u8(header.magic());
    if let MessageHeader::V1 { attributes, .. } = header {
        buf.put_u8(*attributes);
    }
    buf.put_u32(header.checksum());
    buf.put_slice(payload);
    Ok(buf)
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
