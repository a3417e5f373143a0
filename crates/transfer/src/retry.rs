//! Retry decisions for a single transfer task.
//!
//! Pure state machine: the engine feeds it failure classifications and it
//! answers with the next action. Keeping it free of I/O makes the retry
//! rules testable without a network.

use std::time::Duration;

use nimbus_api::FailureKind;

/// What the engine should do after a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Refresh the credential once, then retry the same request.
    RefreshCredential,
    /// Wait, then retry the same request.
    RetryAfterBackoff(Duration),
    /// Give up; the error is terminal for this task.
    Fail,
}

/// Retry budget for one task.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Consecutive transient failures tolerated before giving up.
    pub max_transient_retries: u32,
    /// First backoff delay; doubles per consecutive transient failure.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_transient_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Per-task retry bookkeeping.
///
/// The credential refresh is spent once for the task's whole lifetime; the
/// transient counter resets every time a chunk lands.
#[derive(Debug, Default)]
pub struct RetryState {
    refresh_spent: bool,
    transient_attempts: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides the next action for a failed request.
    pub fn on_failure(&mut self, kind: FailureKind, policy: &RetryPolicy) -> Action {
        match kind {
            FailureKind::CredentialExpired => {
                if self.refresh_spent {
                    Action::Fail
                } else {
                    self.refresh_spent = true;
                    Action::RefreshCredential
                }
            }
            FailureKind::Transient => {
                if self.transient_attempts >= policy.max_transient_retries {
                    Action::Fail
                } else {
                    let delay = policy.backoff_base * 2u32.pow(self.transient_attempts);
                    self.transient_attempts += 1;
                    Action::RetryAfterBackoff(delay)
                }
            }
            FailureKind::Permanent => Action::Fail,
        }
    }

    /// Forward progress clears the transient counter. The refresh stays
    /// spent: a second expiry in the same task means the renewed
    /// credential is bad too.
    pub fn on_progress(&mut self) {
        self.transient_attempts = 0;
    }

    pub fn refresh_spent(&self) -> bool {
        self.refresh_spent
    }
}
