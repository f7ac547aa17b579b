//! Message sets.
//!
//! A message set is a run of length-prefixed messages with no header of its own.
//! Compressing a set wraps the whole run as the payload of a single version-1
//! message; parsing unwraps such messages recursively so callers always see a
//! flat sequence of uncompressed messages.
//!
//! Fetch responses are cut at an arbitrary byte boundary, so the last message
//! in a set is often incomplete. It is dropped silently and left out of
//! [`MessageSet::size`], which is what a consumer advances its offset by.

use crate::compression::Compression;
use crate::error::ProtocolError;
use crate::message::{read_u32, Message, LENGTH_SIZE, MIN_HEADER_SIZE};
use bytes::BytesMut;
use tracing::trace;

/// Default maximum nesting of compressed message sets.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Default maximum number of bytes produced by decompression for one parse (64 MiB).
pub const DEFAULT_MAX_EXPANDED_SIZE: usize = 64 * 1024 * 1024;

/// Bounds applied while expanding compressed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// How many compressed sets may be nested inside each other.
    pub max_depth: usize,
    /// Total decompressed bytes allowed across all nesting levels.
    pub max_expanded_size: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_expanded_size: DEFAULT_MAX_EXPANDED_SIZE,
        }
    }
}

impl ParseLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_expanded_size(mut self, size: usize) -> Self {
        self.max_expanded_size = size;
        self
    }
}

/// The result of parsing a contiguous region of message bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSet {
    /// Bytes of the input that were consumed, excluding any truncated tail.
    pub size: usize,
    /// Uncompressed messages in wire order.
    pub messages: Vec<Message>,
}

impl MessageSet {
    /// Parses `data` with the default [`ParseLimits`].
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::parse_with_limits(data, &ParseLimits::default())
    }

    /// Parses `data`, expanding compressed messages within `limits`.
    pub fn parse_with_limits(data: &[u8], limits: &ParseLimits) -> Result<Self, ProtocolError> {
        let mut parser = Parser {
            limits,
            budget: limits.max_expanded_size,
            messages: Vec::new(),
        };
        let size = parser.parse(data, 0)?;
        Ok(Self {
            size,
            messages: parser.messages,
        })
    }

    /// Encodes `messages` as a message set.
    ///
    /// With a codec other than [`Compression::None`], the uncompressed set
    /// becomes the payload of one compressed message.
    pub fn build(
        messages: &[Message],
        compression: Compression,
    ) -> Result<BytesMut, ProtocolError> {
        let mut set = BytesMut::new();
        for message in messages {
            set.extend_from_slice(&message.encode(Compression::None)?);
        }

        if !compression.is_compressed() {
            return Ok(set);
        }
        Message::new(set.freeze()).encode(compression)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl IntoIterator for MessageSet {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageSet {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

struct Parser<'a> {
    limits: &'a ParseLimits,
    /// Decompressed bytes still allowed.
    budget: usize,
    messages: Vec<Message>,
}

impl Parser<'_> {
    /// Appends the messages in `data` and returns the number of bytes consumed.
    fn parse(&mut self, data: &[u8], depth: usize) -> Result<usize, ProtocolError> {
        let mut pos = 0;

        while data.len() - pos >= MIN_HEADER_SIZE {
            let remaining = &data[pos..];
            let message_len = LENGTH_SIZE.saturating_add(read_u32(remaining, 0) as usize);
            if message_len > remaining.len() {
                trace!(
                    "truncated message at byte {}: need {}, have {}",
                    pos,
                    message_len,
                    remaining.len()
                );
                break;
            }

            let message = Message::decode(remaining)?;
            match message.compression()? {
                Compression::None => self.messages.push(message),
                codec => self.expand(&message, codec, depth)?,
            }

            pos += message_len;
        }

        Ok(pos)
    }

    fn expand(
        &mut self,
        message: &Message,
        codec: Compression,
        depth: usize,
    ) -> Result<(), ProtocolError> {
        if depth >= self.limits.max_depth {
            return Err(ProtocolError::NestingTooDeep {
                max: self.limits.max_depth,
            });
        }

        let limit = self.limits.max_expanded_size;
        let expanded = codec
            .decompress(&message.payload, self.budget)
            .map_err(|e| match e {
                ProtocolError::ExpandedSizeExceeded { .. } => {
                    ProtocolError::ExpandedSizeExceeded { limit }
                }
                other => other,
            })?;
        self.budget -= expanded.len();

        let consumed = self.parse(&expanded, depth + 1)?;
        if consumed != expanded.len() {
            return Err(ProtocolError::MalformedCompressedMessage {
                expected: expanded.len(),
                consumed,
            });
        }

        trace!(
            "expanded {} message at depth {}: {} -> {} bytes",
            codec,
            depth,
            message.payload.len(),
            expanded.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::crc32;

    /// "abracadabra" as a version-1 message inside a GZIP stream.
    const GZIPPED_ABRACADABRA: [u8; 39] = [
        0x1f, 0x8b, 0x08, 0x00, 0x6d, 0x0b, 0x23, 0x50, 0x00, 0x03, 0x63, 0x60, 0x60, 0x10, 0x64,
        0x64, 0x10, 0x7f, 0xf5, 0x73, 0x7b, 0x62, 0x52, 0x51, 0x62, 0x72, 0x62, 0x0a, 0x88, 0x02,
        0x00, 0x7f, 0x65, 0xb9, 0xe4, 0x15, 0x00, 0x00, 0x00,
    ];

    fn v0_bytes(checksum: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(5 + payload.len() as u32).to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(&checksum.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn v1_bytes(attributes: u8, checksum: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(6 + payload.len() as u32).to_be_bytes());
        buf.push(1);
        buf.push(attributes);
        buf.extend_from_slice(&checksum.to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn payloads(set: &MessageSet) -> Vec<&[u8]> {
        set.iter().map(|m| m.payload.as_ref()).collect()
    }

    #[test]
    fn test_parse_empty_input() {
        let set = MessageSet::parse(&[]).unwrap();
        assert_eq!(set.size, 0);
        assert!(set.is_empty());

        let set = MessageSet::parse(&[0, 0, 0, 8]).unwrap();
        assert_eq!(set.size, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_skip_truncated_trailing_length() {
        let mut bytes = v0_bytes(1120192889, b"ale");
        bytes.extend_from_slice(&8u32.to_be_bytes());

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.size, 12);
    }

    #[test]
    fn test_skip_truncated_message_with_empty_message_size() {
        let mut bytes = v0_bytes(1120192889, b"ale");
        // header of a message whose payload is missing
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&1120192889u32.to_be_bytes());

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.size, 12);
    }

    #[test]
    fn test_parse_empty_message() {
        let bytes = v0_bytes(0, b"");
        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.messages[0].payload.is_empty());
        assert!(set.messages[0].is_valid());
        assert_eq!(set.size, 9);
    }

    #[test]
    fn test_parse_gzip_message() {
        let bytes = v1_bytes(1, 1303540914, &GZIPPED_ABRACADABRA);
        let set = MessageSet::parse(&bytes).unwrap();

        assert_eq!(payloads(&set), vec![b"abracadabra".as_ref()]);
        assert!(set.messages[0].is_valid());
        assert_eq!(set.size, 49);
    }

    #[test]
    fn test_parse_nested_gzip() {
        let mut inner = v1_bytes(0, 401275319, b"abracadabra");
        inner.extend_from_slice(&v1_bytes(0, 2666930069, b"foobar"));
        let compressed = Compression::Gzip.compress(&inner).unwrap();
        let bytes = v1_bytes(1, crc32(&compressed), &compressed);

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(payloads(&set), vec![b"abracadabra".as_ref(), b"foobar".as_ref()]);
        assert!(set.iter().all(Message::is_valid));
        assert_eq!(set.size, bytes.len());
    }

    #[test]
    fn test_parse_mixed_compressed_and_uncompressed() {
        let mut bytes = v1_bytes(1, 1303540914, &GZIPPED_ABRACADABRA);
        bytes.extend_from_slice(&v1_bytes(0, 907060870, b"hello"));

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(payloads(&set), vec![b"abracadabra".as_ref(), b"hello".as_ref()]);
        assert!(set.iter().all(Message::is_valid));
    }

    #[test]
    fn test_parse_unsupported_codec() {
        let bytes = v1_bytes(3, 0, b"");
        assert!(matches!(
            MessageSet::parse(&bytes),
            Err(ProtocolError::UnsupportedCompressionCodec(3))
        ));
    }

    #[test]
    fn test_parse_unsupported_magic() {
        let mut bytes = v0_bytes(1120192889, b"ale");
        bytes.extend_from_slice(&[0, 0, 0, 5, 9, 0, 0, 0, 0]);
        assert!(matches!(
            MessageSet::parse(&bytes),
            Err(ProtocolError::UnsupportedMagic(9))
        ));
    }

    #[test]
    fn test_parse_malformed_compressed_set() {
        let mut inner = v0_bytes(crc32(b"foo"), b"foo");
        // a partial message inside a compressed set cannot be fetched later
        inner.extend_from_slice(&[0, 0, 0, 9, 0]);
        let compressed = Compression::Gzip.compress(&inner).unwrap();
        let bytes = v1_bytes(1, crc32(&compressed), &compressed);

        assert!(matches!(
            MessageSet::parse(&bytes),
            Err(ProtocolError::MalformedCompressedMessage {
                expected: 17,
                consumed: 12
            })
        ));
    }

    #[test]
    fn test_build_uncompressed() {
        let messages = vec![Message::new("ale"), Message::new("beer")];
        let bytes = MessageSet::build(&messages, Compression::None).unwrap();
        assert_eq!(bytes.len(), 25);

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(set.messages, messages);
        assert_eq!(set.size, 25);
    }

    #[test]
    fn test_build_gzip() {
        let messages = vec![Message::new("foo"), Message::new("bar")];
        let bytes = MessageSet::build(&messages, Compression::Gzip).unwrap();

        let outer = Message::decode(&bytes).unwrap();
        assert_eq!(outer.compression().unwrap(), Compression::Gzip);
        assert_eq!(bytes.len(), 4 + 6 + outer.payload.len());

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(payloads(&set), vec![b"foo".as_ref(), b"bar".as_ref()]);
        assert_eq!(set.size, bytes.len());
    }

    #[test]
    fn test_build_empty() {
        let bytes = MessageSet::build(&[], Compression::None).unwrap();
        assert!(bytes.is_empty());
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_build_snappy() {
        let messages = vec![Message::new("foo"), Message::new("bar")];
        let bytes = MessageSet::build(&messages, Compression::Snappy).unwrap();
        assert_eq!(bytes[5], Compression::Snappy.attributes());

        let set = MessageSet::parse(&bytes).unwrap();
        assert_eq!(payloads(&set), vec![b"foo".as_ref(), b"bar".as_ref()]);
    }

    #[cfg(not(feature = "snappy"))]
    #[test]
    fn test_parse_snappy_unavailable() {
        let bytes = v1_bytes(2, 0, b"");
        assert!(matches!(
            MessageSet::parse(&bytes),
            Err(ProtocolError::CapabilityUnavailable(Compression::Snappy))
        ));
    }

    /// Wraps `messages` in `levels` layers of GZIP message sets. Each outer
    /// layer is a version-1 GZIP message whose payload is the inner set.
    fn nested(messages: &[Message], levels: usize) -> Vec<u8> {
        let mut bytes = MessageSet::build(messages, Compression::Gzip)
            .unwrap()
            .to_vec();
        for _ in 1..levels {
            let compressed = Compression::Gzip.compress(&bytes).unwrap();
            bytes = v1_bytes(1, crc32(&compressed), &compressed);
        }
        bytes
    }

    #[test]
    fn test_nesting_within_limit() {
        let bytes = nested(&[Message::new("deep")], 3);
        let limits = ParseLimits::new().with_max_depth(3);
        let set = MessageSet::parse_with_limits(&bytes, &limits).unwrap();
        assert_eq!(payloads(&set), vec![b"deep".as_ref()]);
    }

    #[test]
    fn test_nesting_too_deep() {
        let bytes = nested(&[Message::new("deep")], 3);
        let limits = ParseLimits::new().with_max_depth(2);
        assert!(matches!(
            MessageSet::parse_with_limits(&bytes, &limits),
            Err(ProtocolError::NestingTooDeep { max: 2 })
        ));
    }

    #[test]
    fn test_expanded_size_exceeded() {
        let big = Message::new(vec![b'x'; 100_000]);
        let bytes = MessageSet::build(&[big], Compression::Gzip).unwrap();
        // compresses very well, but expands past the limit
        assert!(bytes.len() < 1_000);

        let limits = ParseLimits::new().with_max_expanded_size(10_000);
        assert!(matches!(
            MessageSet::parse_with_limits(&bytes, &limits),
            Err(ProtocolError::ExpandedSizeExceeded { limit: 10_000 })
        ));
    }

    #[test]
    fn test_unbounded_expanded_size() {
        let bytes = MessageSet::build(&[Message::new("foo")], Compression::Gzip).unwrap();
        let limits = ParseLimits::new().with_max_expanded_size(usize::MAX);
        let set = MessageSet::parse_with_limits(&bytes, &limits).unwrap();
        assert_eq!(payloads(&set), vec![b"foo".as_ref()]);
        assert_eq!(set.size, bytes.len());
    }

    #[test]
    fn test_expanded_size_counts_every_level() {
        let bytes = nested(&[Message::new(vec![b'x'; 1_000])], 2);
        // the inner level alone fits; both levels together do not
        let limits = ParseLimits::new().with_max_expanded_size(1_020);
        assert!(matches!(
            MessageSet::parse_with_limits(&bytes, &limits),
            Err(ProtocolError::ExpandedSizeExceeded { limit: 1_020 })
        ));
    }

    #[test]
    fn test_into_iterator() {
        let bytes = MessageSet::build(&[Message::new("a"), Message::new("b")], Compression::None)
            .unwrap();
        let set = MessageSet::parse(&bytes).unwrap();

        let borrowed: Vec<_> = (&set).into_iter().map(|m| m.payload.clone()).collect();
        let owned: Vec<_> = set.into_iter().map(|m| m.payload).collect();
        assert_eq!(borrowed, owned);
    }
}
