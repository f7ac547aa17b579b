//! Consumer.
//!
//! The consumer's position is a byte offset into the partition log. After each
//! fetch it advances by exactly the number of bytes the returned message set
//! consumed, so a message cut off by `max_size` is fetched again next time.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::stream::{Connector, TcpConnector};
use kafka07_protocol::{Encoder, ErrorCode, Message, ParseLimits, Response, EARLIEST_OFFSET};
use std::time::Duration;

/// Default upper bound on the bytes returned by one fetch (1 MiB).
pub const DEFAULT_MAX_SIZE: u32 = 1024 * 1024;

/// Default sleep between polls.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// Offsets requested when looking up the starting position.
pub const MAX_OFFSETS: u32 = 1;

/// Consumer configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub topic: String,
    pub partition: i32,
    /// Starting offset. `None` starts at the earliest offset the broker has.
    pub offset: Option<i64>,
    pub max_size: u32,
    pub polling_interval: Duration,
    /// Fail on a non-zero response error code instead of ignoring it.
    pub check_error_codes: bool,
    pub parse_limits: ParseLimits,
}

impl ConsumerConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset: None,
            max_size: DEFAULT_MAX_SIZE,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            check_error_codes: false,
            parse_limits: ParseLimits::default(),
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn check_error_codes(mut self, check: bool) -> Self {
        self.check_error_codes = check;
        self
    }

    pub fn with_parse_limits(mut self, limits: ParseLimits) -> Self {
        self.parse_limits = limits;
        self
    }
}

/// Reads messages from one topic partition.
pub struct Consumer<C: Connector = TcpConnector> {
    conn: Connection<C>,
    config: ConsumerConfig,
    offset: Option<i64>,
    last_error_code: Option<ErrorCode>,
}

impl Consumer<TcpConnector> {
    pub fn new(conn_config: ConnectionConfig, config: ConsumerConfig) -> Self {
        Self::with_connection(Connection::new(conn_config), config)
    }
}

impl<C: Connector> Consumer<C> {
    pub fn with_connection(conn: Connection<C>, config: ConsumerConfig) -> Self {
        Self {
            conn,
            offset: config.offset,
            config,
            last_error_code: None,
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection<C> {
        &self.conn
    }

    /// Current position, once known.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Error code of the most recent response.
    pub fn last_error_code(&self) -> Option<ErrorCode> {
        self.last_error_code
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Fetches the next messages, looking up the earliest offset first if no
    /// position is known yet.
    ///
    /// Returns an empty vector when there is nothing new.
    pub async fn fetch_once(&mut self) -> Result<Vec<Message>, ClientError> {
        let offset = match self.offset {
            Some(offset) => offset,
            None => {
                let offset = self.earliest_offset().await?;
                self.offset = Some(offset);
                offset
            }
        };

        let request = Encoder::fetch(
            &self.config.topic,
            self.config.partition,
            offset,
            self.config.max_size,
        )?;
        let response = self.request(&request).await?;
        let set = response.message_set(&self.config.parse_limits)?;

        let next = i64::try_from(set.size)
            .ok()
            .and_then(|size| offset.checked_add(size))
            .ok_or(ClientError::OffsetOverflow {
                offset,
                size: set.size,
            })?;
        tracing::debug!(
            "fetched {} messages from {}:{} at {}, next offset {}",
            set.len(),
            self.config.topic,
            self.config.partition,
            offset,
            next
        );
        self.offset = Some(next);
        Ok(set.messages)
    }

    /// Asks the broker for the earliest offset it still holds.
    pub async fn earliest_offset(&mut self) -> Result<i64, ClientError> {
        let request = Encoder::offsets(
            &self.config.topic,
            self.config.partition,
            EARLIEST_OFFSET,
            MAX_OFFSETS,
        )?;
        let response = self.request(&request).await?;

        response
            .offsets()?
            .first()
            .copied()
            .ok_or_else(|| ClientError::NoOffsets {
                topic: self.config.topic.clone(),
                partition: self.config.partition,
            })
    }

    /// Fetches forever, calling `on_messages` with every non-empty result and
    /// sleeping for the polling interval in between.
    ///
    /// Returns only on error; drop the future to stop.
    pub async fn poll_loop<F>(&mut self, mut on_messages: F) -> Result<(), ClientError>
    where
        F: FnMut(Vec<Message>),
    {
        loop {
            let messages = self.fetch_once().await?;
            if !messages.is_empty() {
                on_messages(messages);
            }
            tokio::time::sleep(self.config.polling_interval).await;
        }
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    async fn request(&mut self, bytes: &[u8]) -> Result<Response, ClientError> {
        let frame = self.conn.request(bytes).await?;
        let response = Response::parse(frame.body)?;

        self.last_error_code = Some(response.error_code);
        if !response.is_ok() {
            if self.config.check_error_codes {
                return Err(ClientError::Broker(response.error_code));
            }
            tracing::debug!("ignoring broker error code {}", response.error_code);
        }
        Ok(response)
    }
}
