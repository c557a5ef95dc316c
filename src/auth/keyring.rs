//
//  bitbucket-cloud-cli
//  auth/keyring.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Secure Credential Storage Module
//!
//! Persists opaque credential blobs in the system's native keyring:
//!
//! - **macOS**: Keychain Services
//! - **Linux**: Secret Service API (GNOME Keyring, KWallet)
//! - **Windows**: Windows Credential Manager
//!
//! ## Storage Model
//!
//! - **Service**: `bb:bitbucket-cli`
//! - **Key**: `<host>:<username>`
//! - **Value**: the credential blob, untouched (see [`StoredCredential`](super::StoredCredential))
//!
//! The store has no knowledge of blob contents. There is no file fallback:
//! if the keyring is unavailable, operations fail with
//! [`AuthError::SecretStoreUnavailable`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitbucket_cloud_cli::auth::{KeyringStore, SecretStore};
//!
//! fn manage_credentials() -> Result<(), bitbucket_cloud_cli::auth::AuthError> {
//!     let store = KeyringStore::new();
//!
//!     store.set("bitbucket.org", "alice", "token")?;
//!     assert_eq!(store.get("bitbucket.org", "alice")?.as_deref(), Some("token"));
//!
//!     store.delete("bitbucket.org", "alice")?;
//!     store.delete("bitbucket.org", "alice")?; // deleting twice is fine
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use keyring::Entry;

use super::AuthError;
use crate::APP_NAME;

/// Key/value persistence for credential blobs, keyed by host and username.
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Stores `blob` for `(host, user)`, replacing any previous value.
    fn set(&self, host: &str, user: &str, blob: &str) -> Result<(), AuthError>;

    /// Returns the blob for `(host, user)`, or `None` if there is none.
    ///
    /// Never returns an empty blob.
    fn get(&self, host: &str, user: &str) -> Result<Option<String>, AuthError>;

    /// Deletes the blob for `(host, user)`. Deleting a missing key succeeds.
    fn delete(&self, host: &str, user: &str) -> Result<(), AuthError>;

    /// Checks whether a blob exists for `(host, user)`.
    fn exists(&self, host: &str, user: &str) -> Result<bool, AuthError> {
        Ok(self.get(host, user)?.is_some())
    }
}

/// The keyring key of a `(host, user)` pair.
pub fn entry_key(host: &str, user: &str) -> String {
    format!("{}:{}", host, user)
}

/// Credential storage in the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    /// Creates a store using the `bb:bitbucket-cli` service namespace.
    ///
    /// No keyring access occurs during construction.
    pub fn new() -> Self {
        Self {
            service: format!("{}:bitbucket-cli", APP_NAME),
        }
    }

    fn entry(&self, host: &str, user: &str) -> Result<Entry, AuthError> {
        Entry::new(&self.service, &entry_key(host, user))
            .map_err(|e| AuthError::SecretStoreUnavailable(e.to_string()))
    }
}

impl SecretStore for KeyringStore {
    fn set(&self, host: &str, user: &str, blob: &str) -> Result<(), AuthError> {
        self.entry(host, user)?
            .set_password(blob)
            .map_err(|e| AuthError::SecretStoreUnavailable(e.to_string()))?;
        tracing::debug!(host, user, "stored credential in keyring");
        Ok(())
    }

    fn get(&self, host: &str, user: &str) -> Result<Option<String>, AuthError> {
        match self.entry(host, user)?.get_password() {
            Ok(blob) if blob.is_empty() => Ok(None),
            Ok(blob) => Ok(Some(blob)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::SecretStoreUnavailable(e.to_string())),
        }
    }

    fn delete(&self, host: &str, user: &str) -> Result<(), AuthError> {
        match self.entry(host, user)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(AuthError::SecretStoreUnavailable(e.to_string())),
        }
    }
}

/// In-memory credential storage for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemoryStore {
    fn set(&self, host: &str, user: &str, blob: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry_key(host, user), blob.to_string());
        Ok(())
    }

    fn get(&self, host: &str, user: &str) -> Result<Option<String>, AuthError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entry_key(host, user))
            .filter(|blob| !blob.is_empty())
            .cloned())
    }

    fn delete(&self, host: &str, user: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entry_key(host, user));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key() {
        assert_eq!(entry_key("bitbucket.org", "alice"), "bitbucket.org:alice");
    }

    #[test]
    fn test_memory_store_set_then_get() {
        let store = MemoryStore::new();
        let blob = r#"{"access_token":"T","refresh_token":"R"}"#;
        store.set("bitbucket.org", "alice", blob).unwrap();
        assert_eq!(store.get("bitbucket.org", "alice").unwrap().as_deref(), Some(blob));
        assert!(store.exists("bitbucket.org", "alice").unwrap());
    }

    #[test]
    fn test_memory_store_users_do_not_collide() {
        let store = MemoryStore::new();
        store.set("bitbucket.org", "u1", "one").unwrap();
        store.set("bitbucket.org", "u2", "two").unwrap();

        assert_eq!(store.get("bitbucket.org", "u1").unwrap().as_deref(), Some("one"));
        assert_eq!(store.get("bitbucket.org", "u2").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_memory_store_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set("bitbucket.org", "alice", "tok").unwrap();
        store.delete("bitbucket.org", "alice").unwrap();
        store.delete("bitbucket.org", "alice").unwrap();
        assert!(store.get("bitbucket.org", "alice").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_keyring_store_service_name() {
        assert_eq!(KeyringStore::new().service, "bb:bitbucket-cli");
    }
}
