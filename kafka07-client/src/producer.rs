//! Producer.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::stream::{Connector, TcpConnector};
use kafka07_protocol::{Compression, Encoder, Message, ProducerRequest};

/// Producer configuration.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Topic written by [`Producer::send`].
    pub topic: String,
    /// Partition written by [`Producer::send`].
    pub partition: i32,
    /// Codec applied to every message set sent.
    pub compression: Compression,
}

impl ProducerConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            compression: Compression::None,
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Messages collected for a single [`Producer::batch`] send.
#[derive(Debug, Default)]
pub struct Batch {
    messages: Vec<Message>,
}

impl Batch {
    pub fn push(&mut self, message: impl Into<Message>) {
        self.messages.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Publishes messages to a broker.
///
/// Produce requests are fire-and-forget: the broker sends no response, so a
/// successful send only means the bytes were written.
pub struct Producer<C: Connector = TcpConnector> {
    conn: Connection<C>,
    config: ProducerConfig,
}

impl Producer<TcpConnector> {
    pub fn new(conn_config: ConnectionConfig, config: ProducerConfig) -> Self {
        Self::with_connection(Connection::new(conn_config), config)
    }
}

impl<C: Connector> Producer<C> {
    pub fn with_connection(conn: Connection<C>, config: ProducerConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection<C> {
        &self.conn
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Sends a single message to the configured topic partition.
    pub async fn push(&mut self, message: impl Into<Message>) -> Result<usize, ClientError> {
        self.send(&[message.into()]).await
    }

    /// Sends `messages` to the configured topic partition.
    ///
    /// Returns the number of bytes written.
    pub async fn send(&mut self, messages: &[Message]) -> Result<usize, ClientError> {
        let request = Encoder::produce(
            &self.config.topic,
            self.config.partition,
            messages,
            self.config.compression,
        )?;
        self.conn.write(&request).await
    }

    /// Sends `messages` to an arbitrary topic partition.
    pub async fn send_to(
        &mut self,
        topic: &str,
        partition: i32,
        messages: &[Message],
    ) -> Result<usize, ClientError> {
        let request = Encoder::produce(topic, partition, messages, self.config.compression)?;
        self.conn.write(&request).await
    }

    /// Sends several topic partitions in one multi-produce request.
    pub async fn multi_send(&mut self, requests: &[ProducerRequest]) -> Result<usize, ClientError> {
        let request = Encoder::multiproduce(requests, self.config.compression)?;
        tracing::debug!("multi-produce of {} parts", requests.len());
        self.conn.write(&request).await
    }

    /// Collects messages with `fill` and sends them in one request.
    ///
    /// Nothing is written if `fill` adds no messages.
    pub async fn batch<F>(&mut self, fill: F) -> Result<usize, ClientError>
    where
        F: FnOnce(&mut Batch),
    {
        let mut batch = Batch::default();
        fill(&mut batch);
        if batch.is_empty() {
            return Ok(0);
        }
        self.send(&batch.messages).await
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.conn.close().await
    }
}
