//! Client error types.

use kafka07_protocol::{ErrorCode, ProtocolError};
use std::io;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("not connected")]
    NotConnected,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("broker error: {0}")]
    Broker(ErrorCode),

    #[error("no offsets returned for {topic}:{partition}")]
    NoOffsets { topic: String, partition: i32 },

    #[error("offset {offset} plus {size} fetched bytes overflows")]
    OffsetOverflow { offset: i64, size: usize },
}

impl ClientError {
    /// Returns whether this error came from the socket rather than the data on it.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. }
                | ClientError::Read(_)
                | ClientError::Write(_)
                | ClientError::ConnectionClosed
                | ClientError::Timeout
        )
    }

    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Broker(code) => matches!(code, ErrorCode::Unknown),
            other => other.is_transport(),
        }
    }
}
