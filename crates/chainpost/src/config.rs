//! Submission configuration.

use std::time::Duration;

/// How confirmed a submission must be before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckLevel {
    /// The node has accepted it into its process list.
    #[default]
    TransactionAck,
    /// It is in a directory block.
    DBlockConfirmed,
}

/// Acknowledgment polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckConfig {
    /// Wait between polls.
    pub poll_interval: Duration,
    /// Polls before giving up with a timeout.
    pub max_attempts: u32,
    pub level: AckLevel,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 100,
            level: AckLevel::TransactionAck,
        }
    }
}

impl AckConfig {
    /// Longer bound for large backfills.
    pub fn backfill() -> Self {
        Self {
            max_attempts: 300,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_level(mut self, level: AckLevel) -> Self {
        self.level = level;
        self
    }
}

/// Configuration for an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitConfig {
    pub ack: AckConfig,
    /// Look the chain up before committing it, and fail instead of paying
    /// for a chain that already exists.
    pub check_chain_exists: bool,
}

impl SubmitConfig {
    pub fn with_ack(mut self, ack: AckConfig) -> Self {
        self.ack = ack;
        self
    }

    pub fn with_chain_exists_check(mut self, check: bool) -> Self {
        self.check_chain_exists = check;
        self
    }
}
