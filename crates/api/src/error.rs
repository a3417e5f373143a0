//! API error type and failure classification.

/// Broad failure classes the transfer engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The bearer credential was rejected; a silent refresh may fix it.
    CredentialExpired,
    /// Network-level or throttling failure; retrying the same request is
    /// reasonable.
    Transient,
    /// The server rejected the request for a reason a retry cannot fix.
    Permanent,
}

/// Errors produced by remote drive calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed ({status}) {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

impl ApiError {
    /// Classifies this error for the engine's retry policy.
    ///
    /// Credential expiry is detected from the 401 status or the structured
    /// error code. Matching on the human-readable message is kept as a
    /// low-confidence fallback: the service has been observed to return
    /// "token is expired" bodies under non-401 statuses.
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Http(_) => FailureKind::Transient,
            ApiError::Status {
                status,
                code,
                message,
            } => {
                if *status == 401
                    || code == "InvalidAuthenticationToken"
                    || message.contains("token is expired")
                {
                    FailureKind::CredentialExpired
                } else if *status == 408 || *status == 429 || *status >= 500 {
                    FailureKind::Transient
                } else {
                    FailureKind::Permanent
                }
            }
            ApiError::UnexpectedBody(_) => FailureKind::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, code: &str, message: &str) -> ApiError {
        ApiError::Status {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    #[test]
    fn unauthorized_is_credential_expired() {
        assert_eq!(
            status(401, "unauthenticated", "").kind(),
            FailureKind::CredentialExpired
        );
    }

    #[test]
    fn structured_code_is_credential_expired() {
        assert_eq!(
            status(400, "InvalidAuthenticationToken", "CompactToken parsing failed").kind(),
            FailureKind::CredentialExpired
        );
    }

    #[test]
    fn message_sniffing_fallback() {
        assert_eq!(
            status(500, "generalException", "Access token is expired.").kind(),
            FailureKind::CredentialExpired
        );
    }

    #[test]
    fn server_errors_are_transient() {
        assert_eq!(status(503, "serviceNotAvailable", "").kind(), FailureKind::Transient);
        assert_eq!(status(429, "tooManyRequests", "").kind(), FailureKind::Transient);
        assert_eq!(status(408, "timeout", "").kind(), FailureKind::Transient);
    }

    #[test]
    fn client_errors_are_permanent() {
        assert_eq!(status(403, "accessDenied", "").kind(), FailureKind::Permanent);
        assert_eq!(status(404, "itemNotFound", "").kind(), FailureKind::Permanent);
        assert_eq!(status(409, "nameAlreadyExists", "").kind(), FailureKind::Permanent);
    }
}
