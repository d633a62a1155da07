//! Submission state machine.
//!
//! ```text
//! Composing -> Committing -> Committed -> Revealing -> Revealed -> AwaitingAck -> Acknowledged
//!                                     \---------- (transactions) --------/
//! any non-terminal state -> Failed
//! ```

use std::fmt;

/// What is being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    Chain,
    Entry,
    Transaction,
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmissionKind::Chain => "chain",
            SubmissionKind::Entry => "entry",
            SubmissionKind::Transaction => "transaction",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Composing,
    Committing,
    Committed,
    Revealing,
    Revealed,
    AwaitingAck,
    Acknowledged,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Acknowledged | SubmissionState::Failed)
    }

    /// Whether `self -> next` is a legal step for `kind`.
    pub fn can_transition_to(self, next: SubmissionState, kind: SubmissionKind) -> bool {
        use SubmissionState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        match (self, next) {
            (Composing, Committing)
            | (Committing, Committed)
            | (Revealed, AwaitingAck)
            | (AwaitingAck, Acknowledged) => true,
            (Committed, Revealing) | (Revealing, Revealed) => kind != SubmissionKind::Transaction,
            // A transaction is one message: no reveal.
            (Committed, AwaitingAck) => kind == SubmissionKind::Transaction,
            _ => false,
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmissionState::Composing => "COMPOSING",
            SubmissionState::Committing => "COMMITTING",
            SubmissionState::Committed => "COMMITTED",
            SubmissionState::Revealing => "REVEALING",
            SubmissionState::Revealed => "REVEALED",
            SubmissionState::AwaitingAck => "AWAITING_ACK",
            SubmissionState::Acknowledged => "ACKNOWLEDGED",
            SubmissionState::Failed => "FAILED",
        })
    }
}

/// Current state of one submission, with the path it took.
#[derive(Debug, Clone)]
pub struct Tracker {
    kind: SubmissionKind,
    history: Vec<SubmissionState>,
}

impl Tracker {
    pub fn new(kind: SubmissionKind) -> Self {
        Self {
            kind,
            history: vec![SubmissionState::Composing],
        }
    }

    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    pub fn state(&self) -> SubmissionState {
        self.history
            .last()
            .copied()
            .unwrap_or(SubmissionState::Composing)
    }

    /// Every state visited, oldest first.
    pub fn history(&self) -> &[SubmissionState] {
        &self.history
    }

    pub(crate) fn advance(&mut self, next: SubmissionState) {
        let current = self.state();
        debug_assert!(
            current.can_transition_to(next, self.kind),
            "illegal {} transition {current} -> {next}",
            self.kind
        );
        tracing::debug!(kind = %self.kind, from = %current, to = %next, "submission state");
        self.history.push(next);
    }
}
