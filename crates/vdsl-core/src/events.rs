//! Event system for UI decoupling.
//!
//! Allows the CLI (or tests) to follow the console dialogue without
//! tight coupling to the session driver.

use std::fmt;
use std::sync::Mutex;

use crate::state::SessionState;

/// Traffic direction on the console channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Tx, // Host -> Modem
    Rx, // Modem -> Host
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Tx => write!(f, "TX"),
            Direction::Rx => write!(f, "RX"),
        }
    }
}

/// Events emitted by the session driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Channel handed to the driver.
    Connected { peer: String },
    /// State machine transition.
    PhaseChanged { from: SessionState, to: SessionState },
    /// Bytes written or read. Credentials are never included.
    Traffic { direction: Direction, length: usize },
    /// Both status blobs captured.
    Complete,
    /// Run aborted.
    Failed { phase: SessionState, message: String },
}

/// Observer trait for receiving session events.
pub trait SessionObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &SessionEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected { peer } => {
                tracing::info!(peer = %peer, "Console session started");
            }
            SessionEvent::PhaseChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Phase changed");
            }
            SessionEvent::Traffic { direction, length } => {
                tracing::trace!(dir = %direction, len = length, "Console traffic");
            }
            SessionEvent::Complete => {
                tracing::info!("Status capture complete");
            }
            SessionEvent::Failed { phase, message } => {
                tracing::error!(phase = %phase, "Session failed: {}", message);
            }
        }
    }
}

/// Observer that keeps every event, for inspection in tests.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// States entered, in order.
    pub fn phases(&self) -> Vec<SessionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
