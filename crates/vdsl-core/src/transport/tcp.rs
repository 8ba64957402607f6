//! Telnet-over-TCP channel implementation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, trace};

use super::telnet::TelnetFilter;
use super::traits::{Channel, TransportError};

/// TCP channel that hides telnet negotiation from the session.
pub struct TcpChannel {
    stream: TcpStream,
    filter: TelnetFilter,
    addr: String,
}

impl TcpChannel {
    /// Connect to `host:port`, giving up after `timeout`.
    #[instrument(level = "info", skip(timeout), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::ConnectFailed {
                    addr,
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::ConnectFailed {
                    addr,
                    message: format!("no answer within {}ms", timeout.as_millis()),
                });
            }
        };

        info!(addr = %addr, "Connected");
        Ok(Self::from_stream(stream, addr))
    }

    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        Self {
            stream,
            filter: TelnetFilter::new(),
            addr,
        }
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len.max(1)];

        // Chunks consisting only of negotiation yield no data; keep reading.
        loop {
            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(|e| TransportError::ReadFailed(e.to_string()))?;
            if n == 0 {
                return Err(TransportError::Disconnected);
            }

            let filtered = self.filter.feed(&buf[..n]);
            if !filtered.replies.is_empty() {
                trace!(len = filtered.replies.len(), "Refusing telnet options");
                self.stream
                    .write_all(&filtered.replies)
                    .await
                    .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
            }

            if !filtered.data.is_empty() {
                debug!(bytes_read = filtered.data.len(), "Read complete");
                return Ok(filtered.data);
            }
        }
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::telnet::{DO, IAC, WONT};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_negotiation_is_answered_and_stripped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[IAC, DO, 24]).await.unwrap();
            socket.write_all(b"Account:").await.unwrap();
            let mut reply = [0u8; 3];
            socket.read_exact(&mut reply).await.unwrap();
            reply
        });

        let mut channel = TcpChannel::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let mut text = Vec::new();
        while !text.ends_with(b"Account:") {
            text.extend(channel.read(64).await.unwrap());
        }
        assert_eq!(text, b"Account:");
        assert_eq!(server.await.unwrap(), [IAC, WONT, 24]);
    }

    #[tokio::test]
    async fn test_closed_stream_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut channel = TcpChannel::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let err = channel.read(64).await.unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }
}
