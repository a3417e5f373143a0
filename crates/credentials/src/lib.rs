//! Account persistence and credential lifecycle.
//!
//! [`CredentialStore`] is the durable record of known accounts.
//! [`CredentialBroker`] owns the authoritative credential per account and
//! guarantees at most one in-flight refresh per account, fanning the result
//! out to every concurrent caller.

pub mod broker;
pub mod provider;
pub mod store;

pub use broker::{CredentialBroker, RefreshError};
pub use provider::{IdentityProvider, ProviderError, ProviderFuture};
pub use store::{Account, CredentialStore, StoreError, default_store_path};
