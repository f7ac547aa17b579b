//! Broker responses.
//!
//! A response frame body starts with a two-byte error code; the rest is a
//! message set (fetch) or a list of offsets (offsets).

use crate::error::{ErrorCode, ProtocolError};
use crate::message_set::{MessageSet, ParseLimits};
use bytes::Bytes;

/// Size of the error code at the front of every response body.
pub const ERROR_CODE_SIZE: usize = 2;

/// A decoded response frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub error_code: ErrorCode,
    pub payload: Bytes,
}

impl Response {
    /// Splits a frame body into its error code and payload.
    pub fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.len() < ERROR_CODE_SIZE {
            return Err(ProtocolError::IncompleteResponse {
                needed: ERROR_CODE_SIZE - body.len(),
            });
        }

        let error_code = ErrorCode::from_code(i16::from_be_bytes([body[0], body[1]]));
        let payload = body.split_off(ERROR_CODE_SIZE);
        Ok(Self {
            error_code,
            payload,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.error_code.is_ok()
    }

    /// Decodes an offsets response payload: `count(4) ++ offset(8) * count`.
    pub fn offsets(&self) -> Result<Vec<i64>, ProtocolError> {
        let payload = &self.payload[..];
        if payload.len() < 4 {
            return Err(ProtocolError::IncompleteResponse {
                needed: 4 - payload.len(),
            });
        }

        let count = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
        let needed = 4 + count.saturating_mul(8);
        if payload.len() < needed {
            return Err(ProtocolError::IncompleteResponse {
                needed: needed - payload.len(),
            });
        }

        Ok(payload[4..needed]
            .chunks_exact(8)
            .map(|chunk| {
                i64::from_be_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ])
            })
            .collect())
    }

    /// Parses a fetch response payload.
    pub fn message_set(&self, limits: &ParseLimits) -> Result<MessageSet, ProtocolError> {
        MessageSet::parse_with_limits(&self.payload, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use crate::message::Message;

    fn body(code: i16, payload: &[u8]) -> Bytes {
        let mut buf = code.to_be_bytes().to_vec();
        buf.extend_from_slice(payload);
        Bytes::from(buf)
    }

    #[test]
    fn test_parse_error_code() {
        let response = Response::parse(body(0, b"abc")).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.error_code, ErrorCode::NoError);
        assert_eq!(response.payload.as_ref(), b"abc");

        let response = Response::parse(body(1, b"")).unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.error_code, ErrorCode::OffsetOutOfRange);
        assert!(response.payload.is_empty());

        let response = Response::parse(body(-1, b"")).unwrap();
        assert_eq!(response.error_code, ErrorCode::Unknown);
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Response::parse(Bytes::from_static(&[0])),
            Err(ProtocolError::IncompleteResponse { needed: 1 })
        ));
        assert!(matches!(
            Response::parse(Bytes::new()),
            Err(ProtocolError::IncompleteResponse { needed: 2 })
        ));
    }

    #[test]
    fn test_offsets() {
        let mut payload = 2u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&42i64.to_be_bytes());
        payload.extend_from_slice(&7i64.to_be_bytes());

        let response = Response::parse(body(0, &payload)).unwrap();
        assert_eq!(response.offsets().unwrap(), vec![42, 7]);
        // the first offset sits at bytes 4..12 of the payload
        assert_eq!(&response.payload[4..12], &42i64.to_be_bytes());
    }

    #[test]
    fn test_offsets_empty() {
        let response = Response::parse(body(0, &0u32.to_be_bytes())).unwrap();
        assert!(response.offsets().unwrap().is_empty());
    }

    #[test]
    fn test_offsets_truncated() {
        let mut payload = 1u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&[0, 0, 0]);

        let response = Response::parse(body(0, &payload)).unwrap();
        assert!(matches!(
            response.offsets(),
            Err(ProtocolError::IncompleteResponse { needed: 5 })
        ));

        let response = Response::parse(body(0, &[0, 0])).unwrap();
        assert!(matches!(
            response.offsets(),
            Err(ProtocolError::IncompleteResponse { needed: 2 })
        ));
    }

    #[test]
    fn test_message_set() {
        let mut set =
            MessageSet::build(&[Message::new("foo"), Message::new("bar")], Compression::None)
                .unwrap()
                .to_vec();
        // a partial trailing message, as cut off by max_size
        set.extend_from_slice(&[0, 0, 0, 9, 0, 1]);

        let response = Response::parse(body(0, &set)).unwrap();
        let parsed = response.message_set(&ParseLimits::default()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.size, 24);
    }
}
