//! Durable account store.
//!
//! Accounts are cached in memory and persisted to a JSON file on every
//! mutation. A single explicit `primary` pointer replaces the legacy
//! "current account" slot of older clients; it always refers to an
//! existing entry and is cleared when that entry is removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from account store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown account: {0}")]
    UnknownAccount(String),
}

/// One signed-in account with its current bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub display_name: String,
    /// Opaque bearer token; replaced wholesale on every refresh.
    pub credential: String,
    /// `false` once a refresh has failed in a way that needs user attention.
    #[serde(default = "default_true")]
    pub last_known_valid: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    accounts: HashMap<String, Account>,
    #[serde(default)]
    primary: Option<String>,
}

/// Persistent, thread-safe account store.
pub struct CredentialStore {
    path: PathBuf,
    inner: RwLock<StoreFile>,
}

impl CredentialStore {
    /// Creates a store, loading existing accounts from disk.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let inner = load_file(&path)?;
        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    /// Returns the account with the given id, if any.
    pub fn get(&self, account_id: &str) -> Option<Account> {
        self.inner.read().unwrap().accounts.get(account_id).cloned()
    }

    /// Inserts or replaces an account and persists the change.
    pub fn upsert(&self, account: Account) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().unwrap();
            inner.accounts.insert(account.id.clone(), account);
        }
        self.persist()
    }

    /// Removes an account and persists the change.
    ///
    /// If the removed account was the primary, the pointer is cleared.
    pub fn remove(&self, account_id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().unwrap();
            inner.accounts.remove(account_id);
            if inner.primary.as_deref() == Some(account_id) {
                inner.primary = None;
            }
        }
        self.persist()
    }

    /// Returns all stored accounts (order unspecified).
    pub fn list(&self) -> Vec<Account> {
        self.inner.read().unwrap().accounts.values().cloned().collect()
    }

    /// Returns the primary account id, if one is set.
    pub fn primary_id(&self) -> Option<String> {
        self.inner.read().unwrap().primary.clone()
    }

    /// Marks an existing account as primary and persists the change.
    pub fn set_primary(&self, account_id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().unwrap();
            if !inner.accounts.contains_key(account_id) {
                return Err(StoreError::UnknownAccount(account_id.to_string()));
            }
            inner.primary = Some(account_id.to_string());
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let inner = self.inner.read().unwrap();
        let json = serde_json::to_string_pretty(&*inner)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!(
            accounts = inner.accounts.len(),
            path = ?self.path,
            "persisted account store"
        );
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<StoreFile, StoreError> {
    if !path.exists() {
        return Ok(StoreFile::default());
    }
    let data = std::fs::read_to_string(path)?;
    let file: StoreFile = serde_json::from_str(&data)?;
    debug!(accounts = file.accounts.len(), path = ?path, "loaded account store");
    Ok(file)
}

/// Returns the default account store path under the platform config dir.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("nimbus").join("accounts.json"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, token: &str) -> Account {
        Account {
            id: id.into(),
            display_name: format!("user {id}"),
            credential: token.into(),
            last_known_valid: true,
        }
    }

    fn test_store() -> (tempfile::TempDir, CredentialStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(tmp.path().join("accounts.json")).unwrap();
        (tmp, store)
    }

    #[test]
    fn new_store_empty() {
        let (_tmp, store) = test_store();
        assert!(store.list().is_empty());
        assert!(store.get("a1").is_none());
        assert!(store.primary_id().is_none());
    }

    #[test]
    fn upsert_and_get() {
        let (_tmp, store) = test_store();
        store.upsert(account("a1", "tok-1")).unwrap();
        assert_eq!(store.get("a1").unwrap().credential, "tok-1");

        store.upsert(account("a1", "tok-2")).unwrap();
        assert_eq!(store.get("a1").unwrap().credential, "tok-2");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn persist_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.json");

        {
            let store = CredentialStore::new(path.clone()).unwrap();
            store.upsert(account("a1", "tok-1")).unwrap();
            store.upsert(account("a2", "tok-2")).unwrap();
            store.set_primary("a2").unwrap();
        }

        let store2 = CredentialStore::new(path).unwrap();
        assert_eq!(store2.list().len(), 2);
        assert_eq!(store2.get("a2").unwrap().credential, "tok-2");
        assert_eq!(store2.primary_id().as_deref(), Some("a2"));
    }

    #[test]
    fn set_primary_requires_existing_account() {
        let (_tmp, store) = test_store();
        assert!(matches!(
            store.set_primary("ghost"),
            Err(StoreError::UnknownAccount(_))
        ));

        store.upsert(account("a1", "t")).unwrap();
        store.set_primary("a1").unwrap();
        assert_eq!(store.primary_id().as_deref(), Some("a1"));
    }

    #[test]
    fn removing_primary_clears_pointer() {
        let (_tmp, store) = test_store();
        store.upsert(account("a1", "t")).unwrap();
        store.set_primary("a1").unwrap();

        store.remove("a1").unwrap();
        assert!(store.get("a1").is_none());
        assert!(store.primary_id().is_none());
    }

    #[test]
    fn removing_non_primary_keeps_pointer() {
        let (_tmp, store) = test_store();
        store.upsert(account("a1", "t")).unwrap();
        store.upsert(account("a2", "t")).unwrap();
        store.set_primary("a1").unwrap();

        store.remove("a2").unwrap();
        assert_eq!(store.primary_id().as_deref(), Some("a1"));
    }
}
