//! Poll lifecycle and "latest poll wins" bookkeeping.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Fetching { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,
    Failed,
}

/// Issues monotonically increasing poll tokens and decides which
/// completions may touch the view.
///
/// Only the most recently issued token is accepted. A slower, older poll
/// that resolves after a newer one is discarded, whatever the transport
/// did with it.
#[derive(Debug, Default)]
pub struct PollController {
    last_issued: u64,
    current: Option<u64>,
    last_outcome: Option<PollOutcome>,
}

impl PollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a poll. Any poll still in flight is superseded.
    pub fn begin(&mut self) -> u64 {
        self.last_issued += 1;
        self.current = Some(self.last_issued);
        self.last_issued
    }

    /// Supersede any in-flight poll without starting a new one.
    pub fn abandon(&mut self) {
        self.current = None;
    }

    /// Record a completion. Returns `true` when `token` is the current
    /// poll and its result should be applied.
    pub fn complete(&mut self, token: u64, outcome: PollOutcome) -> bool {
        if self.current != Some(token) {
            return false;
        }
        self.current = None;
        self.last_outcome = Some(outcome);
        true
    }

    pub fn phase(&self) -> PollPhase {
        match self.current {
            Some(token) => PollPhase::Fetching { token },
            None => PollPhase::Idle,
        }
    }

    pub fn last_outcome(&self) -> Option<PollOutcome> {
        self.last_outcome
    }
}
