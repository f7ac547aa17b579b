//! Compression codecs for message payloads.
//!
//! The codec of a version-1 message is selected by the low two bits of its
//! attributes byte:
//! - 0: none
//! - 1: GZIP
//! - 2: Snappy (requires the `snappy` feature)
//!
//! Snappy payloads are written in the snappy-java stream framing the JVM broker
//! produces; raw unframed blocks are accepted when reading.

use crate::error::ProtocolError;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::trace;

/// Payload compression codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    #[default]
    None = 0,
    Gzip = 1,
    Snappy = 2,
}

impl Compression {
    /// Attribute bits that select the codec.
    pub const CODEC_MASK: u8 = 0x03;

    /// Resolves the codec selected by a version-1 attributes byte.
    pub fn from_attributes(attributes: u8) -> Result<Self, ProtocolError> {
        match attributes & Self::CODEC_MASK {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            other => Err(ProtocolError::UnsupportedCompressionCodec(other)),
        }
    }

    /// Returns the attributes byte that selects this codec.
    pub fn attributes(self) -> u8 {
        self as u8
    }

    pub fn is_compressed(self) -> bool {
        !matches!(self, Compression::None)
    }

    /// Returns whether this build can compress and decompress with this codec.
    pub fn is_available(self) -> bool {
        match self {
            Compression::None | Compression::Gzip => true,
            Compression::Snappy => cfg!(feature = "snappy"),
        }
    }

    /// Compresses `data` with this codec.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip_compress(data),
            Compression::Snappy => snappy::compress(data),
        }
    }

    /// Decompresses `data`, failing once the output would exceed `limit` bytes.
    pub fn decompress(self, data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip_decompress(data, limit),
            Compression::Snappy => snappy::decompress(data, limit),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Snappy => write!(f, "snappy"),
        }
    }
}

impl FromStr for Compression {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" | "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "snappy" => Ok(Compression::Snappy),
            other => Err(ProtocolError::UnknownCompression(other.to_string())),
        }
    }
}

fn codec_error(codec: Compression, err: impl fmt::Display) -> ProtocolError {
    ProtocolError::Codec {
        codec,
        reason: err.to_string(),
    }
}

fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| codec_error(Compression::Gzip, e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| codec_error(Compression::Gzip, e))?;
    trace!("gzip: {} -> {} bytes", data.len(), compressed.len());
    Ok(compressed)
}

fn gzip_decompress(data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
    let mut decompressed = Vec::new();
    MultiGzDecoder::new(data)
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut decompressed)
        .map_err(|e| codec_error(Compression::Gzip, e))?;
    if decompressed.len() > limit {
        return Err(ProtocolError::ExpandedSizeExceeded { limit });
    }
    trace!("gunzip: {} -> {} bytes", data.len(), decompressed.len());
    Ok(decompressed)
}

#[cfg(feature = "snappy")]
mod snappy {
    use super::{codec_error, Compression};
    use crate::error::ProtocolError;
    use snap::raw::{decompress_len, Decoder, Encoder};
    use tracing::trace;

    /// Stream header written by snappy-java's `SnappyOutputStream`.
    const JAVA_MAGIC: &[u8] = &[0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0];
    const JAVA_VERSION: [u8; 4] = [0, 0, 0, 1];
    const JAVA_COMPATIBLE: [u8; 4] = [0, 0, 0, 1];
    const HEADER_SIZE: usize = 16;

    /// Uncompressed bytes per framed block.
    const BLOCK_SIZE: usize = 32 * 1024;

    pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut encoder = Encoder::new();
        let mut out = Vec::with_capacity(HEADER_SIZE + data.len());
        out.extend_from_slice(JAVA_MAGIC);
        out.extend_from_slice(&JAVA_VERSION);
        out.extend_from_slice(&JAVA_COMPATIBLE);

        for block in data.chunks(BLOCK_SIZE) {
            let compressed = encoder
                .compress_vec(block)
                .map_err(|e| codec_error(Compression::Snappy, e))?;
            out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
            out.extend_from_slice(&compressed);
        }

        trace!("snappy: {} -> {} bytes", data.len(), out.len());
        Ok(out)
    }

    pub(super) fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
        if !data.starts_with(JAVA_MAGIC) {
            return decompress_block(data, limit);
        }

        if data.len() < HEADER_SIZE {
            return Err(codec_error(Compression::Snappy, "truncated stream header"));
        }
        if data[8..12] != JAVA_VERSION {
            return Err(codec_error(
                Compression::Snappy,
                format!("unknown stream version {:?}", &data[8..12]),
            ));
        }

        let mut out = Vec::new();
        let mut pos = HEADER_SIZE;
        while pos < data.len() {
            if data.len() - pos < 4 {
                return Err(codec_error(Compression::Snappy, "truncated block length"));
            }
            let block_len =
                u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
                    as usize;
            pos += 4;
            if data.len() - pos < block_len {
                return Err(codec_error(Compression::Snappy, "truncated block"));
            }
            let block = decompress_block(&data[pos..pos + block_len], limit - out.len())?;
            out.extend_from_slice(&block);
            pos += block_len;
        }

        trace!("unsnappy: {} -> {} bytes", data.len(), out.len());
        Ok(out)
    }

    fn decompress_block(block: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
        let len = decompress_len(block).map_err(|e| codec_error(Compression::Snappy, e))?;
        if len > limit {
            return Err(ProtocolError::ExpandedSizeExceeded { limit });
        }
        Decoder::new()
            .decompress_vec(block)
            .map_err(|e| codec_error(Compression::Snappy, e))
    }
}

#[cfg(not(feature = "snappy"))]
mod snappy {
    use super::Compression;
    use crate::error::ProtocolError;

    pub(super) fn compress(_data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        Err(ProtocolError::CapabilityUnavailable(Compression::Snappy))
    }

    pub(super) fn decompress(_data: &[u8], _limit: usize) -> Result<Vec<u8>, ProtocolError> {
        Err(ProtocolError::CapabilityUnavailable(Compression::Snappy))
    }
}
