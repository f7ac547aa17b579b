//! Request types.

use crate::message::Message;

/// Request type tags, sent as the first two bytes of every request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestType {
    Produce = 0,
    Fetch = 1,
    MultiFetch = 2,
    MultiProduce = 3,
    Offsets = 4,
}

impl RequestType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(RequestType::Produce),
            1 => Some(RequestType::Fetch),
            2 => Some(RequestType::MultiFetch),
            3 => Some(RequestType::MultiProduce),
            4 => Some(RequestType::Offsets),
            _ => None,
        }
    }
}

/// One topic/partition part of a multi-produce request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerRequest {
    pub topic: String,
    pub partition: i32,
    pub messages: Vec<Message>,
}

impl ProducerRequest {
    /// Creates a request for partition 0 of `topic`.
    pub fn new(topic: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            messages,
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }
}
