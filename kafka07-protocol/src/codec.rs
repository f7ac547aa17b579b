//! Request encoder.
//!
//! Every request is a frame whose body starts with a [`RequestType`] tag:
//!
//! ```text
//! produce:      PRODUCE(2) topic_len(2) topic partition(4) set_len(4) set
//! multiproduce: MULTIPRODUCE(2) count(2) [topic_len(2) topic partition(4) set_len(4) set]*
//! fetch:        FETCH(2) topic_len(2) topic partition(4) offset(8) max_size(4)
//! offsets:      OFFSETS(2) topic_len(2) topic partition(4) time(8) max_offsets(4)
//! ```

use crate::compression::Compression;
use crate::error::ProtocolError;
use crate::frame::{Frame, FRAME_HEADER_SIZE};
use crate::message::Message;
use crate::message_set::MessageSet;
use crate::request::{ProducerRequest, RequestType};
use bytes::{BufMut, BytesMut};
use tracing::trace;

/// Encodes requests into wire frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a produce request for one topic partition.
    pub fn produce(
        topic: &str,
        partition: i32,
        messages: &[Message],
        compression: Compression,
    ) -> Result<BytesMut, ProtocolError> {
        let mut body = BytesMut::new();
        body.put_u16(RequestType::Produce.code());
        put_part(&mut body, topic, partition, messages, compression)?;

        trace!(
            "produce {}:{} with {} messages ({} bytes)",
            topic,
            partition,
            messages.len(),
            body.len()
        );
        Frame::new(body.freeze()).encode()
    }

    /// Encodes a multi-produce request. Parts are written in the given order.
    pub fn multiproduce(
        requests: &[ProducerRequest],
        compression: Compression,
    ) -> Result<BytesMut, ProtocolError> {
        let count = u16::try_from(requests.len())
            .map_err(|_| ProtocolError::TooManyRequests(requests.len()))?;

        let mut body = BytesMut::new();
        body.put_u16(RequestType::MultiProduce.code());
        body.put_u16(count);
        for request in requests {
            put_part(
                &mut body,
                &request.topic,
                request.partition,
                &request.messages,
                compression,
            )?;
        }

        trace!("multiproduce with {} parts ({} bytes)", count, body.len());
        Frame::new(body.freeze()).encode()
    }

    /// Encodes a fetch request starting at the byte `offset`.
    pub fn fetch(
        topic: &str,
        partition: i32,
        offset: i64,
        max_size: u32,
    ) -> Result<BytesMut, ProtocolError> {
        lookup(RequestType::Fetch, topic, partition, offset, max_size)
    }

    /// Encodes an offsets request.
    ///
    /// `time` is a timestamp in milliseconds or one of
    /// [`EARLIEST_OFFSET`](crate::EARLIEST_OFFSET) and [`LATEST_OFFSET`](crate::LATEST_OFFSET).
    pub fn offsets(
        topic: &str,
        partition: i32,
        time: i64,
        max_offsets: u32,
    ) -> Result<BytesMut, ProtocolError> {
        lookup(RequestType::Offsets, topic, partition, time, max_offsets)
    }
}

fn topic_len(topic: &str) -> Result<u16, ProtocolError> {
    u16::try_from(topic.len()).map_err(|_| ProtocolError::TopicTooLong(topic.len()))
}

fn put_part(
    buf: &mut BytesMut,
    topic: &str,
    partition: i32,
    messages: &[Message],
    compression: Compression,
) -> Result<(), ProtocolError> {
    let set = MessageSet::build(messages, compression)?;

    buf.put_u16(topic_len(topic)?);
    buf.put_slice(topic.as_bytes());
    buf.put_i32(partition);
    buf.put_u32(set.len() as u32);
    buf.put_slice(&set);
    Ok(())
}

/// Fetch and offsets requests share a fixed layout, so the length is known
/// from the field widths before anything is written.
fn lookup(
    request_type: RequestType,
    topic: &str,
    partition: i32,
    value: i64,
    limit: u32,
) -> Result<BytesMut, ProtocolError> {
    let topic_len = topic_len(topic)?;
    let length = 2 + 2 + topic.len() + 4 + 8 + 4;

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + length);
    buf.put_u32(length as u32);
    buf.put_u16(request_type.code());
    buf.put_u16(topic_len);
    buf.put_slice(topic.as_bytes());
    buf.put_i32(partition);
    buf.put_i64(value);
    buf.put_u32(limit);

    debug_assert_eq!(buf.len(), FRAME_HEADER_SIZE + length);
    Ok(buf)
}
