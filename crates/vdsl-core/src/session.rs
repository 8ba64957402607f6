//! VDSL session - high-level orchestrator for one statistics query.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::events::{SessionObserver, TracingObserver};
use crate::extract::{Diagnostics, FieldExtractor, OutputRecord};
use crate::protocol::constants::*;
use crate::schema::{FieldSchema, SchemaError};
use crate::state::{
    Credentials, DriverSettings, SessionContext, SessionDriver, SessionError, StatusBlobs,
};
use crate::transport::{Channel, TcpChannel};

/// Configuration for a VDSL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Modem address.
    pub host: String,
    /// Telnet port.
    pub port: u16,
    pub username: String,
    pub password: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Budget for each login prompt in milliseconds.
    pub marker_timeout_ms: u64,
    /// Pause after each status command before reading, in milliseconds.
    pub settle_delay_ms: u64,
    /// Bound on the read following the settle delay, in milliseconds.
    pub response_timeout_ms: u64,
    pub basic_read_size: usize,
    pub extended_read_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: TELNET_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            marker_timeout_ms: DEFAULT_MARKER_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            basic_read_size: BASIC_READ_SIZE,
            extended_read_size: EXTENDED_READ_SIZE,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            marker_timeout: Duration::from_millis(self.marker_timeout_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            basic_read_size: self.basic_read_size,
            extended_read_size: self.extended_read_size,
        }
    }
}

/// One successful reading.
#[derive(Debug, Clone)]
pub struct Reading {
    pub record: OutputRecord,
    /// Fields that could not be extracted.
    pub diagnostics: Diagnostics,
}

/// VDSL session - connects, captures both status blobs, extracts the record.
pub struct VdslSession<O: SessionObserver> {
    config: SessionConfig,
    observer: Arc<O>,
    extractor: FieldExtractor,
    cancel: CancellationToken,
}

impl VdslSession<TracingObserver> {
    /// Create a new session for the Vigor 130 layout with the tracing observer.
    pub fn new(config: SessionConfig) -> Result<Self, SchemaError> {
        Self::with_observer(config, &FieldSchema::vigor130()?, Arc::new(TracingObserver))
    }
}

impl<O: SessionObserver> VdslSession<O> {
    /// Create a new session with a custom schema and observer.
    pub fn with_observer(
        config: SessionConfig,
        schema: &FieldSchema,
        observer: Arc<O>,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            config,
            observer,
            extractor: FieldExtractor::new(schema)?,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts a running query when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connect over telnet and run the query.
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    pub async fn run(&self) -> Result<Reading, SessionError> {
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let connect = TcpChannel::connect(&self.config.host, self.config.port, timeout);

        let channel = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SessionError::Cancelled { phase: Default::default() });
            }
            res = connect => res.map_err(SessionError::Connect)?,
        };

        self.run_on(channel).await
    }

    /// Run the query over an already open channel.
    pub async fn run_on<C: Channel>(&self, channel: C) -> Result<Reading, SessionError> {
        let driver = SessionDriver::with_observer(self.config.driver_settings(), self.observer.clone())
            .with_cancellation(self.cancel.clone());

        let context = SessionContext::new(self.config.credentials(), channel);
        let blobs = driver.run(context).await?;

        Ok(self.extract(&blobs))
    }

    fn extract(&self, blobs: &StatusBlobs) -> Reading {
        let extraction = self.extractor.extract(&blobs.basic, &blobs.extended);
        info!(
            fields = extraction.record.len(),
            missed = extraction.diagnostics.len(),
            "Extraction finished"
        );
        Reading {
            record: extraction.record,
            diagnostics: extraction.diagnostics,
        }
    }
}
