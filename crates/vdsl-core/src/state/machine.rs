//! State machine for the Vigor console dialogue.

use std::fmt;

/// Phase of the login/command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for the `Account:` prompt.
    #[default]
    AwaitUsername,
    /// Username sent, waiting for `Password: `.
    AwaitPassword,
    /// Password sent, waiting for the shell prompt.
    AwaitPrompt,
    /// `vdsl status` sent, collecting its output.
    IssueBasicCommand,
    /// `vdsl status more` sent, collecting its output.
    IssueExtendedCommand,
    /// Both blobs captured.
    Complete,
    /// Run aborted.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitUsername => write!(f, "AWAIT_USERNAME"),
            SessionState::AwaitPassword => write!(f, "AWAIT_PASSWORD"),
            SessionState::AwaitPrompt => write!(f, "AWAIT_PROMPT"),
            SessionState::IssueBasicCommand => write!(f, "ISSUE_BASIC_COMMAND"),
            SessionState::IssueExtendedCommand => write!(f, "ISSUE_EXTENDED_COMMAND"),
            SessionState::Complete => write!(f, "COMPLETE"),
            SessionState::Failed => write!(f, "FAILED"),
        }
    }
}

impl SessionState {
    /// Successor on the happy path. Terminal states have none.
    pub fn next(&self) -> Option<SessionState> {
        match self {
            SessionState::AwaitUsername => Some(SessionState::AwaitPassword),
            SessionState::AwaitPassword => Some(SessionState::AwaitPrompt),
            SessionState::AwaitPrompt => Some(SessionState::IssueBasicCommand),
            SessionState::IssueBasicCommand => Some(SessionState::IssueExtendedCommand),
            SessionState::IssueExtendedCommand => Some(SessionState::Complete),
            SessionState::Complete | SessionState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Failed)
    }
}

/// Tracks the current state and enforces legal transitions.
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to the happy-path successor. Returns the new state, or `None`
    /// when already terminal.
    pub fn advance(&mut self) -> Option<SessionState> {
        let next = self.state.next()?;
        self.goto_state(next);
        Some(next)
    }

    /// Enter `Failed`. Allowed from any non-terminal state.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.goto_state(SessionState::Failed);
        }
    }

    fn goto_state(&mut self, new_state: SessionState) {
        tracing::info!(from = %self.state, to = %new_state, "State transition");
        self.state = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_order() {
        let mut machine = SessionMachine::new();
        let mut seen = vec![machine.state()];
        while let Some(state) = machine.advance() {
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                SessionState::AwaitUsername,
                SessionState::AwaitPassword,
                SessionState::AwaitPrompt,
                SessionState::IssueBasicCommand,
                SessionState::IssueExtendedCommand,
                SessionState::Complete,
            ]
        );
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_fail_from_any_state() {
        let mut machine = SessionMachine::new();
        machine.advance();
        machine.fail();
        assert_eq!(machine.state(), SessionState::Failed);
        assert_eq!(machine.advance(), None);
    }

    #[test]
    fn test_complete_cannot_fail() {
        let mut machine = SessionMachine::new();
        while machine.advance().is_some() {}
        machine.fail();
        assert_eq!(machine.state(), SessionState::Complete);
    }
}
