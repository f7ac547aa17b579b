//! # kafka07-protocol
//!
//! Wire protocol implementation for the 0.7-era Kafka broker.
//!
//! This crate provides:
//! - The message envelope (magic byte, compression attributes, CRC32, payload)
//! - Message sets, including transparent decoding of compressed nested sets
//! - GZIP and (optionally) Snappy compression
//! - Produce, multi-produce, fetch and offsets request framing
//! - Response frame decoding and broker error codes
//!
//! All multi-byte integers are big-endian and nothing is padded.

pub mod codec;
pub mod compression;
pub mod error;
pub mod frame;
pub mod message;
pub mod message_set;
pub mod request;
pub mod response;

pub use codec::Encoder;
pub use compression::Compression;
pub use error::{ErrorCode, ProtocolError};
pub use frame::{Frame, FRAME_HEADER_SIZE};
pub use message::{crc32, Message, MessageHeader};
pub use message_set::{MessageSet, ParseLimits};
pub use request::{ProducerRequest, RequestType};
pub use response::Response;

/// Default broker host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default broker port.
pub const DEFAULT_PORT: u16 = 9092;

/// Maximum frame body size accepted or produced (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Offsets request time value selecting the earliest available offset.
pub const EARLIEST_OFFSET: i64 = -2;

/// Offsets request time value selecting the latest offset.
pub const LATEST_OFFSET: i64 = -1;
