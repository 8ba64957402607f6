//! Scripted mock channel for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{Channel, TransportError};

/// One scripted device action, consumed per read.
#[derive(Debug, Clone)]
pub enum MockRead {
    /// Bytes returned by the read (truncated to `max_len`, remainder re-queued).
    Data(Vec<u8>),
    /// Peer closes the stream.
    Close,
}

/// Mock channel replaying a scripted device.
///
/// Once the script is exhausted reads block forever, like a device that
/// stopped talking. Clones share the script and write log, so a test can
/// keep a handle after moving the channel into the driver.
#[derive(Clone)]
pub struct MockChannel {
    /// Queued reads.
    script: Arc<Mutex<VecDeque<MockRead>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Simulated latency before each read completes.
    read_delay: Duration,
    /// Whether the channel is still "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            read_delay: Duration::ZERO,
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Delay every read by `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Queue text to be returned on a later read.
    pub fn queue_text(&self, text: &str) {
        self.queue(MockRead::Data(text.as_bytes().to_vec()));
    }

    /// Queue a peer close.
    pub fn queue_close(&self) {
        self.queue(MockRead::Close);
    }

    pub fn queue(&self, read: MockRead) {
        self.script.lock().unwrap().push_back(read);
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Captured writes decoded as text.
    pub fn written_lines(&self) -> Vec<String> {
        self.get_writes()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Simulate the peer going away.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }

    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(MockRead::Data(mut data)) => {
                if data.len() > max_len {
                    let rest = data.split_off(max_len);
                    self.script.lock().unwrap().push_front(MockRead::Data(rest));
                }
                Ok(data)
            }
            Some(MockRead::Close) => {
                self.disconnect();
                Err(TransportError::Disconnected)
            }
            None => std::future::pending().await,
        }
    }

    fn peer(&self) -> String {
        "mock".to_string()
    }
}
