//
//  bitbucket-cloud-cli
//  auth/resolver.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Credential resolution.
//!
//! The first of these that yields a value wins:
//!
//! 1. `BB_TOKEN` (bearer, from the environment)
//! 2. `BITBUCKET_TOKEN` (bearer, from the environment)
//! 3. The keychain blob stored for `(host, user)`, classified
//!
//! An environment credential suppresses every keychain read. Resolution has
//! no side effects.

use super::{AuthError, Credential, CredentialSource, SecretStore, StoredCredential};
use crate::config::{Environment, BB_TOKEN, BITBUCKET_TOKEN};

/// Resolves the credential for a host and user.
#[derive(Debug, Clone, Copy)]
pub struct CredentialResolver<'a> {
    env: &'a Environment,
    store: &'a dyn SecretStore,
}

impl<'a> CredentialResolver<'a> {
    /// Creates a resolver over an environment and a secret store.
    pub fn new(env: &'a Environment, store: &'a dyn SecretStore) -> Self {
        Self { env, store }
    }

    /// The environment credential, if `BB_TOKEN` or `BITBUCKET_TOKEN` is set.
    pub fn from_environment(&self) -> Option<Credential> {
        [BB_TOKEN, BITBUCKET_TOKEN]
            .iter()
            .find_map(|key| self.env.var(key))
            .map(|token| Credential::bearer(token, CredentialSource::Environment))
    }

    /// The classified keychain blob of `(host, user)`.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotAuthenticated`] when there is no blob, or the store's
    /// own error when the keychain is unavailable.
    pub fn stored(&self, host: &str, user: &str) -> Result<StoredCredential, AuthError> {
        match self.store.get(host, user)? {
            Some(blob) => Ok(StoredCredential::classify(&blob)),
            None => Err(AuthError::NotAuthenticated {
                host: host.to_string(),
            }),
        }
    }

    /// Resolves the credential for `host` and `user`.
    ///
    /// `user` is usually the host's active user; `None` means nobody is
    /// logged in, which only succeeds when an environment token is set.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_cloud_cli::auth::{CredentialResolver, CredentialSource, MemoryStore, SecretStore};
    /// use bitbucket_cloud_cli::config::Environment;
    ///
    /// let store = MemoryStore::new();
    /// store.set("bitbucket.org", "alice", "stored-token").unwrap();
    ///
    /// let env = Environment::fixed([("BB_TOKEN", "envtok")]);
    /// let credential = CredentialResolver::new(&env, &store)
    ///     .resolve("bitbucket.org", Some("alice"))
    ///     .unwrap();
    /// assert_eq!(credential.token(), Some("envtok"));
    /// assert_eq!(credential.source, CredentialSource::Environment);
    /// ```
    pub fn resolve(&self, host: &str, user: Option<&str>) -> Result<Credential, AuthError> {
        if let Some(credential) = self.from_environment() {
            tracing::debug!(host, "using credential from environment");
            return Ok(credential);
        }

        let user = user.ok_or_else(|| AuthError::NotAuthenticated {
            host: host.to_string(),
        })?;
        let stored = self.stored(host, user)?;
        tracing::debug!(host, user, kind = stored.kind_name(), "using credential from keyring");
        Ok(Credential::from_stored(stored, CredentialSource::Keyring))
    }
}
