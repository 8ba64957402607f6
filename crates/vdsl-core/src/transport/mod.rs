//! Transport layer module.

pub mod mock;
pub mod read_until;
pub mod tcp;
pub mod telnet;
pub mod traits;

pub use mock::{MockChannel, MockRead};
pub use read_until::read_until;
pub use tcp::TcpChannel;
pub use traits::{Channel, TransportError};
