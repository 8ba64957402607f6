//! Telnet command stripping (RFC 854).
//!
//! The modem opens every session with option negotiation. We never enable
//! any option: each `DO` is answered with `WONT` and each `WILL` with `DONT`,
//! so the stream stays plain NVT text. Sub-negotiation blocks are discarded.

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParseState {
    #[default]
    Data,
    Iac,
    Option(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Output of feeding one chunk through the filter.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Application data with all telnet commands removed.
    pub data: Vec<u8>,
    /// Negotiation replies to send back to the server.
    pub replies: Vec<u8>,
}

/// Stateful filter; sequences may be split across reads.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: ParseState,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, input: &[u8]) -> Filtered {
        let mut out = Filtered {
            data: Vec::with_capacity(input.len()),
            replies: Vec::new(),
        };

        for &byte in input {
            self.state = match (self.state, byte) {
                (ParseState::Data, IAC) => ParseState::Iac,
                (ParseState::Data, b) => {
                    out.data.push(b);
                    ParseState::Data
                }
                // Escaped 0xFF data byte
                (ParseState::Iac, IAC) => {
                    out.data.push(IAC);
                    ParseState::Data
                }
                (ParseState::Iac, cmd @ (DO | DONT | WILL | WONT)) => ParseState::Option(cmd),
                (ParseState::Iac, SB) => ParseState::Subnegotiation,
                // NOP, GA, AYT and friends carry no option byte
                (ParseState::Iac, _) => ParseState::Data,
                (ParseState::Option(cmd), option) => {
                    match cmd {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    ParseState::Data
                }
                (ParseState::Subnegotiation, IAC) => ParseState::SubnegotiationIac,
                (ParseState::Subnegotiation, _) => ParseState::Subnegotiation,
                (ParseState::SubnegotiationIac, SE) => ParseState::Data,
                (ParseState::SubnegotiationIac, _) => ParseState::Subnegotiation,
            };
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: u8 = 1;
    const SUPPRESS_GO_AHEAD: u8 = 3;

    #[test]
    fn test_plain_text_passes_through() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(b"Account:");
        assert_eq!(out.data, b"Account:");
        assert!(out.replies.is_empty());
    }

    #[test]
    fn test_refuses_requested_options() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(&[IAC, WILL, ECHO, IAC, DO, SUPPRESS_GO_AHEAD, b'A']);
        assert_eq!(out.data, b"A");
        assert_eq!(out.replies, vec![IAC, DONT, ECHO, IAC, WONT, SUPPRESS_GO_AHEAD]);
    }

    #[test]
    fn test_sequence_split_across_reads() {
        let mut filter = TelnetFilter::new();
        let first = filter.feed(&[b'x', IAC]);
        assert_eq!(first.data, b"x");
        let second = filter.feed(&[DO]);
        assert!(second.data.is_empty());
        let third = filter.feed(&[ECHO, b'y']);
        assert_eq!(third.data, b"y");
        assert_eq!(third.replies, vec![IAC, WONT, ECHO]);
    }

    #[test]
    fn test_subnegotiation_discarded() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(&[b'a', IAC, SB, 24, 1, IAC, SE, b'b']);
        assert_eq!(out.data, b"ab");
        assert!(out.replies.is_empty());
    }

    #[test]
    fn test_escaped_iac_is_data() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(&[IAC, IAC]);
        assert_eq!(out.data, vec![IAC]);
    }
}
