//! Transfer error taxonomy and user-facing retry guidance.

use nimbus_api::{ApiError, FailureKind};

/// What a UI should offer the user after a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// "Try again" is likely to work.
    Retry,
    /// The account or request needs attention first; retrying as-is won't help.
    NeedsAttention,
    /// Nothing to offer (user-initiated outcome).
    Nothing,
}

/// Terminal errors of one transfer task.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The credential was rejected again after a successful refresh.
    #[error("credential rejected after refresh; sign in again")]
    CredentialExpired,

    /// Silent renewal is impossible; an interactive sign-in is required.
    #[error("interactive sign-in required")]
    ConsentRequired,

    /// The identity provider stayed unreachable through all retries.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The upload session's deadline elapsed before completion.
    #[error("upload session expired")]
    SessionExpired,

    /// Network-level failures exhausted the retry budget.
    #[error("network error: {0}")]
    Transient(String),

    /// The server rejected the request; retrying cannot help.
    #[error("upload rejected: {0}")]
    Permanent(String),

    /// The task was cancelled. Not a failure.
    #[error("cancelled")]
    Cancelled,

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Terminal failure from an exhausted or unretryable remote error.
    pub fn from_failure(kind: FailureKind, source: &ApiError) -> Self {
        match kind {
            FailureKind::CredentialExpired => TransferError::CredentialExpired,
            FailureKind::Transient => TransferError::Transient(source.to_string()),
            FailureKind::Permanent => TransferError::Permanent(source.to_string()),
        }
    }

    /// Guidance for the caller's "retry?" decision.
    pub fn user_action(&self) -> UserAction {
        match self {
            TransferError::Transient(_)
            | TransferError::ProviderUnavailable(_)
            | TransferError::SessionExpired => UserAction::Retry,
            TransferError::CredentialExpired
            | TransferError::ConsentRequired
            | TransferError::Permanent(_)
            | TransferError::Io(_) => UserAction::NeedsAttention,
            TransferError::Cancelled => UserAction::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_reads_as_try_again() {
        assert_eq!(
            TransferError::Transient("timeout".into()).user_action(),
            UserAction::Retry
        );
        assert_eq!(
            TransferError::SessionExpired.user_action(),
            UserAction::Retry
        );
    }

    #[test]
    fn auth_failures_need_attention() {
        assert_eq!(
            TransferError::CredentialExpired.user_action(),
            UserAction::NeedsAttention
        );
        assert_eq!(
            TransferError::ConsentRequired.user_action(),
            UserAction::NeedsAttention
        );
        assert_eq!(
            TransferError::Permanent("denied".into()).user_action(),
            UserAction::NeedsAttention
        );
    }

    #[test]
    fn cancellation_is_not_an_error() {
        assert_eq!(TransferError::Cancelled.user_action(), UserAction::Nothing);
    }
}
