//! VDSL-Core: DSL line statistics from a DrayTek Vigor modem console.
//!
//! This crate logs in to the modem's telnet shell, captures the output of
//! `vdsl status` and `vdsl status more`, and turns that text into a flat,
//! typed record.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Prompt markers, commands, default timings
//! - **Transport**: Byte channel abstraction (telnet over TCP, mock), `read_until`
//! - **State**: Session state machine and driver
//! - **Schema / Key**: Declarative field tables and key normalization
//! - **Extract**: Schema-driven text extraction into an `OutputRecord`
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: High-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use vdsl_core::session::{SessionConfig, VdslSession};
//!
//! # async fn query() -> anyhow::Result<()> {
//! let config = SessionConfig {
//!     host: "192.168.1.1".to_string(),
//!     ..Default::default()
//! };
//!
//! let session = VdslSession::new(config)?;
//! let reading = session.run().await?;
//! println!("{}", serde_json::to_string(&reading.record)?);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod extract;
pub mod key;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use events::{Direction, NullObserver, SessionEvent, SessionObserver, TracingObserver};
pub use extract::{Diagnostic, Extraction, FieldExtractor, FieldValue, MissReason, OutputRecord};
pub use schema::{Coercion, FieldSchema, FieldSpec, SchemaError};
pub use session::{Reading, SessionConfig, VdslSession};
pub use state::{
    Credentials, SessionContext, SessionDriver, SessionError, SessionErrorKind, SessionState,
    StatusBlobs,
};
pub use transport::{Channel, MockChannel, TcpChannel, TransportError, read_until};
