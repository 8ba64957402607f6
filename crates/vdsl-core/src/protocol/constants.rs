//! Console markers, commands and transfer sizes for the Vigor 130 telnet shell.

/// Default telnet port.
pub const TELNET_PORT: u16 = 23;

/// Line terminator appended to every credential and command.
pub const CRLF: &str = "\r\n";

// Login dialogue markers
pub const USERNAME_MARKER: &str = "Account:";
pub const PASSWORD_MARKER: &str = "Password: ";
pub const PROMPT_MARKER: &str = "> ";

// Status commands
pub const BASIC_STATUS_COMMAND: &str = "vdsl status";
pub const EXTENDED_STATUS_COMMAND: &str = "vdsl status more";

/// Size of each read while waiting for a marker.
pub const MARKER_READ_SIZE: usize = 1024;

/// Upper bound on the `vdsl status` response.
pub const BASIC_READ_SIZE: usize = 4096;
/// Upper bound on the `vdsl status more` response.
pub const EXTENDED_READ_SIZE: usize = 8192;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";

// Timing defaults (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MARKER_TIMEOUT_MS: u64 = 3000;
/// The shell has no end-of-response marker; commands get this long to finish writing.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;
