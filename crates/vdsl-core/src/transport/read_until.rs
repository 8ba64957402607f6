//! Deadline-bounded marker wait.

use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use super::traits::{Channel, TransportError};
use crate::protocol::MARKER_READ_SIZE;

/// Read from `channel` until the accumulated bytes end with `marker`.
///
/// The whole wait, including the latency of each individual read, is bounded
/// by `budget`. Bytes are never discarded: the returned buffer holds
/// everything read since the call started and ends with the full marker.
pub async fn read_until<C: Channel + ?Sized>(
    channel: &mut C,
    marker: &[u8],
    budget: Duration,
) -> Result<Vec<u8>, TransportError> {
    let deadline = Instant::now() + budget;
    let mut buffer = Vec::new();

    loop {
        let chunk = match timeout_at(deadline, channel.read(MARKER_READ_SIZE)).await {
            Ok(read) => read?,
            Err(_) => {
                debug!(
                    marker = ?String::from_utf8_lossy(marker),
                    received = buffer.len(),
                    "Marker not seen before deadline"
                );
                return Err(TransportError::Timeout {
                    timeout_ms: budget.as_millis() as u64,
                });
            }
        };

        trace!(len = chunk.len(), "Accumulating");
        buffer.extend_from_slice(&chunk);

        if buffer.ends_with(marker) {
            return Ok(buffer);
        }
    }
}
