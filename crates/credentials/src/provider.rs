//! Identity provider seam.
//!
//! The real provider is an OAuth identity service whose interactive consent
//! flow lives in the UI layer. The engine only needs the non-interactive
//! renewal path, so that is all the trait exposes.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`IdentityProvider`] methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Errors from the identity provider's silent renewal path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider requires user interaction; silent renewal cannot proceed.
    #[error("interactive consent required")]
    ConsentRequired,

    /// The provider could not be reached or answered with a transient error.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Non-interactive credential minting for an already-known account.
pub trait IdentityProvider: Send + Sync {
    /// Mints a fresh bearer credential for `account_id` without user
    /// interaction. Returns the new opaque token.
    fn acquire_silent(&self, account_id: &str, scopes: &[String]) -> ProviderFuture<'_, String>;
}
