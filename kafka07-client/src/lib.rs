//! # kafka07-client
//!
//! Client library for the 0.7-era Kafka broker.
//!
//! This crate provides:
//! - A single-connection transport with lazy reconnect
//! - A [`Producer`] for produce and multi-produce requests
//! - A [`Consumer`] that tracks a byte offset and polls a topic partition
//!
//! Every type here owns its socket. Use one instance per task; methods take
//! `&mut self` and nothing is shared or spawned internally.

pub mod connection;
pub mod consumer;
pub mod error;
pub mod producer;
pub mod stream;

pub use connection::{Connection, ConnectionConfig};
pub use consumer::{Consumer, ConsumerConfig};
pub use error::ClientError;
pub use producer::{Batch, Producer, ProducerConfig};
pub use stream::{Connector, TcpConnector};

pub use kafka07_protocol::{Compression, ErrorCode, Message, ProducerRequest};
