//! Protocol error types and broker error codes.

use crate::compression::Compression;
use std::fmt;
use thiserror::Error;

/// Protocol-level errors raised while encoding or decoding messages and frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported message version: magic number {0}")]
    UnsupportedMagic(u8),

    #[error("unsupported compression codec: {0}")]
    UnsupportedCompressionCodec(u8),

    #[error("malformed compressed message: decompressed {expected} bytes, message set consumed {consumed}")]
    MalformedCompressedMessage { expected: usize, consumed: usize },

    #[error("{0} compression is not available in this build")]
    CapabilityUnavailable(Compression),

    #[error("invalid message length {length} for magic {magic} (min {min})")]
    InvalidMessageLength { length: u32, magic: u8, min: u32 },

    #[error("incomplete message: need {needed} more bytes")]
    IncompleteMessage { needed: usize },

    #[error("incomplete response: need {needed} more bytes")]
    IncompleteResponse { needed: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: u32 },

    #[error("topic name too long: {0} bytes (max 65535)")]
    TopicTooLong(usize),

    #[error("too many producer requests: {0} (max 65535)")]
    TooManyRequests(usize),

    #[error("compressed message sets nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("decompressed data exceeds limit of {limit} bytes")]
    ExpandedSizeExceeded { limit: usize },

    #[error("{codec} codec failed: {reason}")]
    Codec { codec: Compression, reason: String },

    #[error("unknown compression method: {0:?} (expected no, gzip or snappy)")]
    UnknownCompression(String),
}

/// Status codes carried in the first two bytes of every broker response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    NoError,
    OffsetOutOfRange,
    InvalidMessage,
    WrongPartition,
    InvalidFetchSize,
    /// A code this client does not know about.
    Unrecognized(i16),
}

impl ErrorCode {
    pub fn from_code(code: i16) -> Self {
        match code {
            -1 => ErrorCode::Unknown,
            0 => ErrorCode::NoError,
            1 => ErrorCode::OffsetOutOfRange,
            2 => ErrorCode::InvalidMessage,
            3 => ErrorCode::WrongPartition,
            4 => ErrorCode::InvalidFetchSize,
            other => ErrorCode::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            ErrorCode::Unknown => -1,
            ErrorCode::NoError => 0,
            ErrorCode::OffsetOutOfRange => 1,
            ErrorCode::InvalidMessage => 2,
            ErrorCode::WrongPartition => 3,
            ErrorCode::InvalidFetchSize => 4,
            ErrorCode::Unrecognized(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ErrorCode::NoError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Unknown => write!(f, "UNKNOWN"),
            ErrorCode::NoError => write!(f, "NO_ERROR"),
            ErrorCode::OffsetOutOfRange => write!(f, "OFFSET_OUT_OF_RANGE"),
            ErrorCode::InvalidMessage => write!(f, "INVALID_MESSAGE"),
            ErrorCode::WrongPartition => write!(f, "WRONG_PARTITION"),
            ErrorCode::InvalidFetchSize => write!(f, "INVALID_FETCH_SIZE"),
            ErrorCode::Unrecognized(code) => write!(f, "UNRECOGNIZED({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        for code in -1..=4 {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
        assert_eq!(ErrorCode::from_code(42), ErrorCode::Unrecognized(42));
        assert_eq!(ErrorCode::from_code(42).code(), 42);
    }

    #[test]
    fn test_error_code_is_ok() {
        assert!(ErrorCode::NoError.is_ok());
        assert!(!ErrorCode::Unknown.is_ok());
        assert!(!ErrorCode::OffsetOutOfRange.is_ok());
        assert!(!ErrorCode::Unrecognized(9).is_ok());
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::NoError), "NO_ERROR");
        assert_eq!(format!("{}", ErrorCode::Unknown), "UNKNOWN");
        assert_eq!(
            format!("{}", ErrorCode::OffsetOutOfRange),
            "OFFSET_OUT_OF_RANGE"
        );
        assert_eq!(format!("{}", ErrorCode::InvalidMessage), "INVALID_MESSAGE");
        assert_eq!(format!("{}", ErrorCode::WrongPartition), "WRONG_PARTITION");
        assert_eq!(
            format!("{}", ErrorCode::InvalidFetchSize),
            "INVALID_FETCH_SIZE"
        );
        assert_eq!(format!("{}", ErrorCode::Unrecognized(7)), "UNRECOGNIZED(7)");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnsupportedMagic(2);
        assert!(err.to_string().contains("magic number 2"));

        let err = ProtocolError::UnsupportedCompressionCodec(3);
        assert!(err.to_string().contains("codec: 3"));

        let err = ProtocolError::MalformedCompressedMessage {
            expected: 40,
            consumed: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("40") && msg.contains("32"));

        let err = ProtocolError::CapabilityUnavailable(Compression::Snappy);
        assert!(err.to_string().contains("snappy"));

        let err = ProtocolError::IncompleteMessage { needed: 10 };
        assert!(err.to_string().contains("10"));

        let err = ProtocolError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::UnknownCompression("lz4".to_string());
        assert!(err.to_string().contains("lz4"));
    }
}
