//! Credential broker: the single authority for refreshing credentials.
//!
//! Concurrent uploads for the same account must not each trigger an
//! independent provider round-trip — the provider would race against
//! itself and later responses could invalidate earlier ones. The broker
//! therefore de-duplicates refreshes per account: the first caller becomes
//! the leader and performs the round-trip, every concurrent caller parks on
//! a waiter and observes the leader's result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::provider::{IdentityProvider, ProviderError};
use crate::store::{Account, CredentialStore};

/// Errors from a credential refresh.
///
/// Clonable so a single leader result can fan out to all waiters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The account is gone (removed concurrently). Terminal; do not retry.
    #[error("no such account: {0}")]
    NoSuchAccount(String),

    /// Transient provider failure. Retry with bounded backoff is reasonable.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Silent renewal cannot proceed; an interactive flow is required.
    #[error("interactive consent required")]
    ConsentRequired,

    /// The new credential could not be persisted; it was not handed out.
    #[error("credential store write failed: {0}")]
    Store(String),
}

type Waiter = oneshot::Sender<Result<String, RefreshError>>;

/// Owns the authoritative credential per account.
pub struct CredentialBroker<P: IdentityProvider> {
    store: Arc<CredentialStore>,
    provider: Arc<P>,
    scopes: Vec<String>,
    /// Accounts with a refresh in flight, each with its parked waiters.
    inflight: Mutex<HashMap<String, Vec<Waiter>>>,
}

impl<P: IdentityProvider> CredentialBroker<P> {
    pub fn new(store: Arc<CredentialStore>, provider: Arc<P>, scopes: Vec<String>) -> Self {
        Self {
            store,
            provider,
            scopes,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the last known-good credential without a network call.
    pub fn current(&self, account_id: &str) -> Result<String, RefreshError> {
        self.store
            .get(account_id)
            .map(|a| a.credential)
            .ok_or_else(|| RefreshError::NoSuchAccount(account_id.to_string()))
    }

    /// Mints a new credential for the account via the identity provider.
    ///
    /// If a refresh for the same account is already in flight, no second
    /// round-trip is started; this call suspends until the in-flight refresh
    /// resolves and returns its result. On success the new credential is
    /// written through the store before any caller observes it.
    pub async fn refresh(&self, account_id: &str) -> Result<String, RefreshError> {
        let waiter = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get_mut(account_id) {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    inflight.insert(account_id.to_string(), Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!(account = %account_id, "joining in-flight refresh");
            return match rx.await {
                Ok(result) => result,
                // Leader dropped without resolving (e.g. its task was
                // aborted); treat as a transient provider failure.
                Err(_) => Err(RefreshError::ProviderUnavailable(
                    "refresh aborted".to_string(),
                )),
            };
        }

        let result = self.perform_refresh(account_id).await;

        let waiters = self
            .inflight
            .lock()
            .unwrap()
            .remove(account_id)
            .unwrap_or_default();
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
        result
    }

    async fn perform_refresh(&self, account_id: &str) -> Result<String, RefreshError> {
        let account = self
            .store
            .get(account_id)
            .ok_or_else(|| RefreshError::NoSuchAccount(account_id.to_string()))?;

        info!(account = %account_id, "refreshing credential");
        let token = match self.provider.acquire_silent(account_id, &self.scopes).await {
            Ok(token) => token,
            Err(ProviderError::ConsentRequired) => {
                self.mark_invalid(account);
                return Err(RefreshError::ConsentRequired);
            }
            Err(ProviderError::Unavailable(msg)) => {
                return Err(RefreshError::ProviderUnavailable(msg));
            }
        };

        // Durability precedes visibility: the credential is persisted
        // before any caller can observe it.
        let updated = Account {
            credential: token.clone(),
            last_known_valid: true,
            ..account
        };
        self.store
            .upsert(updated)
            .map_err(|e| RefreshError::Store(e.to_string()))?;

        debug!(account = %account_id, "credential refreshed");
        Ok(token)
    }

    /// Best-effort flag that this account needs user attention.
    fn mark_invalid(&self, account: Account) {
        let id = account.id.clone();
        let flagged = Account {
            last_known_valid: false,
            ..account
        };
        if let Err(e) = self.store.upsert(flagged) {
            warn!(account = %id, error = %e, "failed to flag account as invalid");
        }
    }
}
