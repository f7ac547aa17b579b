//! Stream opening.
//!
//! A [`Connection`](crate::Connection) opens its socket through a [`Connector`]
//! whenever it needs one, so the reconnect policy does not depend on TCP.

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens byte streams to a broker.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a new stream.
    fn connect(&self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("failed to set TCP_NODELAY on {}:{}: {}", self.host, self.port, e);
        }
        Ok(stream)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Connector;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_test::io::Mock;

    /// Hands out scripted streams in order, then refuses connections.
    pub(crate) struct MockConnector {
        streams: Mutex<VecDeque<io::Result<Mock>>>,
        attempts: AtomicUsize,
    }

    impl MockConnector {
        pub(crate) fn new(streams: Vec<Mock>) -> Self {
            Self::with_results(streams.into_iter().map(Ok).collect())
        }

        pub(crate) fn with_results(results: Vec<io::Result<Mock>>) -> Self {
            Self {
                streams: Mutex::new(results.into()),
                attempts: AtomicUsize::new(0),
            }
        }

        pub(crate) fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Connector for MockConnector {
        type Stream = Mock;

        async fn connect(&self) -> io::Result<Mock> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.streams.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(io::ErrorKind::ConnectionRefused.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connect_sets_nodelay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = TcpConnector::new("127.0.0.1".to_string(), port);
        let stream = connector.connect().await.unwrap();
        assert!(stream.nodelay().unwrap());
    }
}
