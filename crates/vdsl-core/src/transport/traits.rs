//! Byte channel abstraction.
//!
//! Defines the `Channel` trait for the console session,
//! allowing different implementations (telnet over TCP, mock, etc.).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to {addr}: {message}")]
    ConnectFailed { addr: String, message: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Connection closed by peer")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Abstract bidirectional byte stream to the modem console.
///
/// This trait enables:
/// - Production implementation using tokio TCP with telnet filtering
/// - Mock implementation for unit testing
#[async_trait]
pub trait Channel: Send {
    /// Write raw bytes to the device.
    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max_len` bytes. Never returns an empty buffer;
    /// a closed stream is reported as `TransportError::Disconnected`.
    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Write a line terminated by CRLF.
    async fn write_line(&mut self, line: &str) -> Result<usize, TransportError> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(crate::protocol::CRLF.as_bytes());
        self.write(&data).await
    }

    /// Human readable peer description for logs.
    fn peer(&self) -> String;
}
