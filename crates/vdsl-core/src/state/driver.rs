//! Session driver - runs the login and status dialogue over a [`Channel`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::machine::{SessionMachine, SessionState};
use crate::events::{Direction, SessionEvent, SessionObserver, TracingObserver};
use crate::protocol::constants::*;
use crate::transport::{Channel, TransportError, read_until};

/// Coarse failure category, for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    Timeout,
    ConnectionLost,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Could not connect: {0}")]
    Connect(#[source] TransportError),

    #[error("Timed out in {phase} waiting for {waiting_for} after {timeout_ms}ms")]
    Timeout {
        phase: SessionState,
        waiting_for: String,
        timeout_ms: u64,
    },

    #[error("Connection lost in {phase}: {source}")]
    ConnectionLost {
        phase: SessionState,
        #[source]
        source: TransportError,
    },

    #[error("Cancelled in {phase}")]
    Cancelled { phase: SessionState },
}

impl SessionError {
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::Timeout { .. } => SessionErrorKind::Timeout,
            SessionError::Connect(_) | SessionError::ConnectionLost { .. } => {
                SessionErrorKind::ConnectionLost
            }
            SessionError::Cancelled { .. } => SessionErrorKind::Cancelled,
        }
    }

    /// Phase in which the run stopped, if it got that far.
    pub fn phase(&self) -> Option<SessionState> {
        match self {
            SessionError::Connect(_) => None,
            SessionError::Timeout { phase, .. }
            | SessionError::ConnectionLost { phase, .. }
            | SessionError::Cancelled { phase } => Some(*phase),
        }
    }

    fn from_transport(phase: SessionState, waiting_for: &str, err: TransportError) -> Self {
        match err {
            TransportError::Timeout { timeout_ms } => SessionError::Timeout {
                phase,
                waiting_for: waiting_for.to_string(),
                timeout_ms,
            },
            source => SessionError::ConnectionLost { phase, source },
        }
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one run owns. The channel is dropped when the run ends.
pub struct SessionContext<C: Channel> {
    pub credentials: Credentials,
    pub channel: C,
}

impl<C: Channel> SessionContext<C> {
    pub fn new(credentials: Credentials, channel: C) -> Self {
        Self {
            credentials,
            channel,
        }
    }
}

/// Raw output of the two status commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBlobs {
    pub basic: String,
    pub extended: String,
}

/// Timing and sizing knobs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    /// Budget for each login marker.
    pub marker_timeout: Duration,
    /// Pause between sending a command and reading its output.
    pub settle_delay: Duration,
    /// Bound on the read that follows the settle delay.
    pub response_timeout: Duration,
    pub basic_read_size: usize,
    pub extended_read_size: usize,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            marker_timeout: Duration::from_millis(DEFAULT_MARKER_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            basic_read_size: BASIC_READ_SIZE,
            extended_read_size: EXTENDED_READ_SIZE,
        }
    }
}

/// Drives `Account:` → `Password: ` → `> ` → `vdsl status` → `vdsl status more`.
pub struct SessionDriver<O: SessionObserver> {
    settings: DriverSettings,
    observer: Arc<O>,
    cancel: CancellationToken,
}

impl SessionDriver<TracingObserver> {
    /// Create a driver with the default tracing observer.
    pub fn new(settings: DriverSettings) -> Self {
        Self::with_observer(settings, Arc::new(TracingObserver))
    }
}

impl<O: SessionObserver> SessionDriver<O> {
    pub fn with_observer(settings: DriverSettings, observer: Arc<O>) -> Self {
        Self {
            settings,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the run as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the dialogue and return both status blobs.
    ///
    /// Consumes the context so the channel is released on every exit path.
    #[instrument(skip_all, fields(peer = %context.channel.peer()))]
    pub async fn run<C: Channel>(
        &self,
        context: SessionContext<C>,
    ) -> Result<StatusBlobs, SessionError> {
        let SessionContext {
            credentials,
            channel,
        } = context;

        self.observer.on_event(&SessionEvent::Connected {
            peer: channel.peer(),
        });

        let mut channel = ObservableChannel {
            inner: channel,
            observer: self.observer.as_ref(),
        };
        let mut machine = SessionMachine::new();

        let result = self.drive(&mut channel, &credentials, &mut machine).await;

        match &result {
            Ok(_) => self.observer.on_event(&SessionEvent::Complete),
            Err(e) => {
                let phase = machine.state();
                machine.fail();
                self.observer.on_event(&SessionEvent::PhaseChanged {
                    from: phase,
                    to: SessionState::Failed,
                });
                self.observer.on_event(&SessionEvent::Failed {
                    phase,
                    message: e.to_string(),
                });
            }
        }

        result
    }

    async fn drive<C: Channel>(
        &self,
        channel: &mut C,
        credentials: &Credentials,
        machine: &mut SessionMachine,
    ) -> Result<StatusBlobs, SessionError> {
        self.expect(channel, machine.state(), USERNAME_MARKER).await?;

        let phase = self.advance(machine);
        debug!("Sending username");
        self.send(channel, phase, &credentials.username).await?;
        self.expect(channel, phase, PASSWORD_MARKER).await?;

        let phase = self.advance(machine);
        debug!("Sending password");
        self.send(channel, phase, &credentials.password).await?;
        self.expect(channel, phase, PROMPT_MARKER).await?;

        let phase = self.advance(machine);
        let basic = self
            .command(channel, phase, BASIC_STATUS_COMMAND, self.settings.basic_read_size)
            .await?;

        let phase = self.advance(machine);
        let extended = self
            .command(
                channel,
                phase,
                EXTENDED_STATUS_COMMAND,
                self.settings.extended_read_size,
            )
            .await?;

        self.advance(machine);
        Ok(StatusBlobs { basic, extended })
    }

    fn advance(&self, machine: &mut SessionMachine) -> SessionState {
        let from = machine.state();
        let to = machine.advance().unwrap_or(from);
        self.observer.on_event(&SessionEvent::PhaseChanged { from, to });
        to
    }

    /// Race `fut` against cancellation.
    async fn guard<T>(
        &self,
        phase: SessionState,
        fut: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(phase = %phase, "Cancelled");
                Err(SessionError::Cancelled { phase })
            }
            res = fut => res,
        }
    }

    async fn expect<C: Channel>(
        &self,
        channel: &mut C,
        phase: SessionState,
        marker: &str,
    ) -> Result<(), SessionError> {
        debug!(phase = %phase, marker = ?marker, "Waiting for marker");
        let budget = self.settings.marker_timeout;
        self.guard(phase, async {
            read_until(channel, marker.as_bytes(), budget)
                .await
                .map(|_| ())
                .map_err(|e| SessionError::from_transport(phase, &format!("{:?}", marker), e))
        })
        .await
    }

    async fn send<C: Channel>(
        &self,
        channel: &mut C,
        phase: SessionState,
        line: &str,
    ) -> Result<(), SessionError> {
        self.guard(phase, async {
            channel
                .write_line(line)
                .await
                .map(|_| ())
                .map_err(|source| SessionError::ConnectionLost { phase, source })
        })
        .await
    }

    /// Send `command`, wait out the settle delay, then take one bounded read.
    async fn command<C: Channel>(
        &self,
        channel: &mut C,
        phase: SessionState,
        command: &str,
        max_len: usize,
    ) -> Result<String, SessionError> {
        info!(command = %command, "Issuing command");
        self.send(channel, phase, command).await?;

        let settle = self.settings.settle_delay;
        let response_timeout = self.settings.response_timeout;
        let waiting_for = format!("output of {:?}", command);

        self.guard(phase, async {
            tokio::time::sleep(settle).await;
            match tokio::time::timeout(response_timeout, channel.read(max_len)).await {
                Ok(Ok(bytes)) => {
                    debug!(command = %command, bytes = bytes.len(), "Captured response");
                    Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Ok(Err(e)) => Err(SessionError::from_transport(phase, &waiting_for, e)),
                Err(_) => Err(SessionError::Timeout {
                    phase,
                    waiting_for: waiting_for.clone(),
                    timeout_ms: response_timeout.as_millis() as u64,
                }),
            }
        })
        .await
    }
}

/// Channel wrapper that emits traffic events.
struct ObservableChannel<'a, C: Channel, O: SessionObserver> {
    inner: C,
    observer: &'a O,
}

#[async_trait]
impl<'a, C: Channel, O: SessionObserver> Channel for ObservableChannel<'a, C, O> {
    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let res = self.inner.write(data).await;
        if res.is_ok() {
            self.observer.on_event(&SessionEvent::Traffic {
                direction: Direction::Tx,
                length: data.len(),
            });
        }
        res
    }

    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read(max_len).await;
        if let Ok(data) = &res {
            self.observer.on_event(&SessionEvent::Traffic {
                direction: Direction::Rx,
                length: data.len(),
            });
        }
        res
    }

    fn peer(&self) -> String {
        self.inner.peer()
    }
}
