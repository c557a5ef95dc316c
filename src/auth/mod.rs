//
//  bitbucket-cloud-cli
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication Module
//!
//! Acquires, stores, resolves and refreshes the credentials used to talk to
//! Bitbucket Cloud.
//!
//! ## Supported Credentials
//!
//! - **OAuth 2.0**: Authorization Code flow through the browser with a
//!   loopback callback listener. The full token envelope is stored so the
//!   access token can be refreshed.
//! - **Access tokens**: Repository, project or workspace access tokens read
//!   from standard input (`bb auth login --with-token`).
//! - **API tokens**: Atlassian email + API token pairs, stored as
//!   `basic:<email>:<token>` and sent with HTTP Basic authentication.
//! - **Environment**: `BB_TOKEN` or `BITBUCKET_TOKEN` override everything
//!   stored in the keychain.
//!
//! ## Module Structure
//!
//! - [`keyring`]: Secret store adapter over the system keychain
//! - [`token`]: Stored blob formats and stdin token input
//! - [`resolver`]: Credential resolution (environment, then keychain)
//! - [`oauth`]: Authorization Code flow primitives
//! - [`manager`]: Login, logout, status and refresh orchestration
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitbucket_cloud_cli::auth::AuthManager;
//! use bitbucket_cloud_cli::DEFAULT_HOST;
//!
//! async fn whoami() -> anyhow::Result<()> {
//!     let manager = AuthManager::from_environment()?;
//!     let client = manager.authenticated_client(DEFAULT_HOST).await?;
//!     let user: serde_json::Value = client.get("/user").await?;
//!     println!("{}", user["username"]);
//!     Ok(())
//! }
//! ```

mod error;
mod keyring;
mod manager;
mod oauth;
mod resolver;
mod token;

pub use error::AuthError;
pub use self::keyring::*;
pub use manager::*;
pub use oauth::*;
pub use resolver::*;
pub use token::*;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `BB_TOKEN` or `BITBUCKET_TOKEN`.
    Environment,
    /// The system keychain.
    Keyring,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::Keyring => f.write_str("keyring"),
        }
    }
}

/// How a credential is presented to the API.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialKind {
    /// RFC 7617 Basic authentication.
    Basic {
        /// Atlassian account email.
        username: String,
        /// API token.
        password: String,
    },
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

impl fmt::Debug for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// A classified credential ready to be attached to requests.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::auth::{Credential, CredentialSource, StoredCredential};
///
/// let credential = Credential::from_stored(
///     StoredCredential::classify("basic:me@example.com:tok"),
///     CredentialSource::Keyring,
/// );
/// assert!(credential.is_basic());
/// assert_eq!(credential.token(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Presentation of the credential.
    pub kind: CredentialKind,
    /// Where the credential was found.
    pub source: CredentialSource,
}

impl Credential {
    /// A bearer credential.
    pub fn bearer(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            kind: CredentialKind::Bearer {
                token: token.into(),
            },
            source,
        }
    }

    /// A Basic credential.
    pub fn basic(
        username: impl Into<String>,
        password: impl Into<String>,
        source: CredentialSource,
    ) -> Self {
        Self {
            kind: CredentialKind::Basic {
                username: username.into(),
                password: password.into(),
            },
            source,
        }
    }

    /// Converts a classified keychain blob into a credential.
    pub fn from_stored(stored: StoredCredential, source: CredentialSource) -> Self {
        match stored {
            StoredCredential::Basic { username, password } => {
                Self::basic(username, password, source)
            }
            StoredCredential::OAuth(envelope) => Self::bearer(envelope.access_token, source),
            StoredCredential::Token(token) => Self::bearer(token, source),
        }
    }

    /// Whether this is a Basic credential.
    pub fn is_basic(&self) -> bool {
        matches!(self.kind, CredentialKind::Basic { .. })
    }

    /// The bearer token, if this is a bearer credential.
    pub fn token(&self) -> Option<&str> {
        match &self.kind {
            CredentialKind::Bearer { token } => Some(token),
            CredentialKind::Basic { .. } => None,
        }
    }

    /// The secret part of the credential (token or API token).
    pub fn secret(&self) -> &str {
        match &self.kind {
            CredentialKind::Bearer { token } => token,
            CredentialKind::Basic { password, .. } => password,
        }
    }
}

/// The account a credential belongs to, as reported by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Account name; the key used in the registry and the keychain.
    pub username: String,
    /// Account UUID, with braces.
    #[serde(default)]
    pub uuid: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
}
