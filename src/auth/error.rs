//
//  bitbucket-cloud-cli
//  auth/error.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Error kinds of the authentication subsystem.

use thiserror::Error;

/// Errors raised while resolving, acquiring or persisting credentials.
///
/// Every variant is terminal for the command that hit it. [`AuthError::hint`]
/// gives the remediation line the top-level handler prints under the error.
#[derive(Error, Debug)]
pub enum AuthError {
    /// OAuth client credentials are not configured.
    #[error("OAuth client is not configured: {0} must be set")]
    ConfigurationMissing(String),

    /// The system keychain failed with something other than "not found".
    #[error("Secret store unavailable: {0}")]
    SecretStoreUnavailable(String),

    /// No usable credential for the host.
    #[error("Not logged in to {host}")]
    NotAuthenticated {
        /// The host that has no credential.
        host: String,
    },

    /// The credential was rejected by Bitbucket.
    #[error("Token is invalid: {0}")]
    TokenInvalid(String),

    /// The callback `state` did not match the issued value.
    #[error("OAuth state mismatch: the callback did not originate from this login")]
    CsrfViolation,

    /// The authorization server redirected back with an error.
    #[error("Authorization denied: {error}{}", describe(.description))]
    AuthorizationDenied {
        /// The `error` query parameter.
        error: String,
        /// The `error_description` query parameter.
        description: Option<String>,
    },

    /// The browser never came back within the deadline.
    #[error("Authentication timed out")]
    AuthorizationTimeout,

    /// The callback carried neither a code nor an error.
    #[error("OAuth callback did not include an authorization code")]
    MissingCode,

    /// The token endpoint answered with a non-200 status.
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange {
        /// HTTP status code from the token endpoint.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A token read from standard input was empty.
    #[error("No token provided on standard input")]
    EmptyToken,
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

impl AuthError {
    /// A one-line remediation hint for the user, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigurationMissing(_) => Some(
                "Create an OAuth consumer in your Bitbucket workspace settings and export BB_OAUTH_CLIENT_ID and BB_OAUTH_CLIENT_SECRET, or use 'bb auth login --with-token'",
            ),
            Self::NotAuthenticated { .. } => Some("Run 'bb auth login' to authenticate"),
            Self::TokenInvalid(_) => Some("Run 'bb auth login' to authenticate again"),
            Self::AuthorizationTimeout | Self::AuthorizationDenied { .. } => {
                Some("Run 'bb auth login' to try again")
            }
            _ => None,
        }
    }
}
