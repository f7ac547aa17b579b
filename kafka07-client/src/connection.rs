//! Connection management.
//!
//! A connection is either disconnected or holds one open stream:
//!
//! - `Disconnected -> Connected` when a write needs a stream and opening succeeds
//! - `Connected -> Disconnected` on any I/O failure
//!
//! A failed write is retried exactly once on a fresh stream. A failed read is
//! never retried: the caller cannot know how much of the frame was consumed, so
//! the stream is dropped and the error returned.

use crate::error::ClientError;
use crate::stream::{Connector, TcpConnector};
use kafka07_protocol::{Frame, DEFAULT_HOST, DEFAULT_PORT, FRAME_HEADER_SIZE};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Default timeout for opening a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a single write or frame read.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for each write and each response frame.
    pub io_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

enum State<S> {
    Disconnected,
    Connected(S),
}

/// A connection to a broker.
///
/// Not safe for concurrent use: one request is written and its response read
/// before the next may start, which `&mut self` enforces.
pub struct Connection<C: Connector = TcpConnector> {
    config: ConnectionConfig,
    connector: C,
    state: State<C::Stream>,
}

impl Connection<TcpConnector> {
    /// Creates a TCP connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let connector = TcpConnector::new(config.host.clone(), config.port);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> Connection<C> {
    /// Creates a connection that opens streams through `connector`.
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            state: State::Disconnected,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns whether a stream is currently open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    /// Opens the stream now instead of on the first write.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.stream().await.map(|_| ())
    }

    /// Writes `bytes`, reconnecting and retrying once on failure.
    ///
    /// Returns the number of bytes written.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<usize, ClientError> {
        match self.try_write(bytes).await {
            Ok(n) => Ok(n),
            Err(e) if e.is_transport() => {
                tracing::warn!("write to {} failed: {}, reconnecting", self.config.addr(), e);
                self.disconnect();
                self.try_write(bytes).await.map_err(|e| {
                    tracing::debug!("retried write failed: {}", e);
                    self.disconnect();
                    e
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Reads one complete response frame.
    pub async fn read_frame(&mut self) -> Result<Frame, ClientError> {
        let io_timeout = self.config.io_timeout;
        let stream = match &mut self.state {
            State::Connected(stream) => stream,
            State::Disconnected => return Err(ClientError::NotConnected),
        };

        let result = with_timeout(io_timeout, read_frame_from(stream)).await;
        match &result {
            Ok(frame) => tracing::debug!("read {} byte response frame", frame.body.len()),
            Err(e) => {
                tracing::debug!("read from {} failed: {}", self.config.addr(), e);
                self.disconnect();
            }
        }
        result
    }

    /// Writes a request frame and reads the response frame.
    pub async fn request(&mut self, bytes: &[u8]) -> Result<Frame, ClientError> {
        self.write(bytes).await?;
        self.read_frame().await
    }

    /// Shuts the stream down. The next write reconnects.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if let State::Connected(mut stream) =
            std::mem::replace(&mut self.state, State::Disconnected)
        {
            tracing::debug!("closing connection to {}", self.config.addr());
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.state = State::Disconnected;
    }

    async fn try_write(&mut self, bytes: &[u8]) -> Result<usize, ClientError> {
        let io_timeout = self.config.io_timeout;
        let stream = self.stream().await?;

        with_timeout(io_timeout, async {
            stream.write_all(bytes).await.map_err(ClientError::Write)?;
            stream.flush().await.map_err(ClientError::Write)
        })
        .await?;

        tracing::debug!("wrote {} bytes", bytes.len());
        Ok(bytes.len())
    }

    /// Returns the open stream, connecting first if needed.
    async fn stream(&mut self) -> Result<&mut C::Stream, ClientError> {
        if let State::Disconnected = self.state {
            let addr = self.config.addr();
            tracing::debug!("connecting to {}...", addr);

            let stream = with_timeout(self.config.connect_timeout, async {
                self.connector
                    .connect()
                    .await
                    .map_err(|source| ClientError::Connect {
                        addr: addr.clone(),
                        source,
                    })
            })
            .await?;

            tracing::debug!("connected to {}", addr);
            self.state = State::Connected(stream);
        }

        match &mut self.state {
            State::Connected(stream) => Ok(stream),
            State::Disconnected => Err(ClientError::NotConnected),
        }
    }
}

async fn with_timeout<T>(
    duration: Duration,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ClientError::Timeout)?
}

async fn read_frame_from<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Frame, ClientError> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    stream.read_exact(&mut header).await.map_err(read_error)?;

    let body_len = Frame::body_len(header)?;
    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await.map_err(read_error)?;
    Ok(Frame::new(body))
}

fn read_error(err: io::Error) -> ClientError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ClientError::ConnectionClosed
    } else {
        ClientError::Read(err)
    }
}
