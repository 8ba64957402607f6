//! State machine module.

pub mod driver;
pub mod machine;

pub use driver::{
    Credentials, DriverSettings, SessionContext, SessionDriver, SessionError, SessionErrorKind,
    StatusBlobs,
};
pub use machine::{SessionMachine, SessionState};
