//
//  bitbucket-cloud-cli
//  auth/token.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Stored Token Formats
//!
//! A keychain entry holds one opaque string. Three encodings share that
//! single column and are told apart by inspection, in this order:
//!
//! | Encoding | Example | Meaning |
//! |----------|---------|---------|
//! | `basic:` prefix | `basic:me@example.com:ATATT3x…` | Atlassian email + API token, sent as HTTP Basic |
//! | JSON object with `access_token` | `{"access_token":"…","refresh_token":"…"}` | OAuth token envelope |
//! | anything else | `ATCTT3x…` | Plain bearer token (repository/workspace access token) |
//!
//! Classification is total: every non-empty string lands in exactly one
//! variant of [`StoredCredential`].

use std::io::BufRead;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

const BASIC_PREFIX: &str = "basic:";

/// The OAuth token envelope returned by Bitbucket's token endpoint.
///
/// Persisted as-is so the refresh token and lifetime survive for refresh.
/// Unknown fields are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEnvelope {
    /// The bearer token presented to the API.
    pub access_token: String,

    /// Token used to obtain a new access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type, normally `bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenEnvelope {
    /// Serializes the envelope to the compact JSON stored in the keychain.
    pub fn to_json(&self) -> String {
        // A struct of strings, integers and a JSON map always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether the access token expires within `margin` of `now`.
    ///
    /// Unknown lifetimes or acquisition times never count as expiring.
    pub fn expires_within(
        &self,
        obtained_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        margin: Duration,
    ) -> bool {
        match (obtained_at, self.expires_in) {
            (Some(obtained_at), Some(expires_in)) => {
                let expires_at = obtained_at + Duration::seconds(expires_in as i64);
                expires_at - margin <= now
            }
            _ => false,
        }
    }

    /// Granted scopes as a list.
    pub fn scope_list(&self) -> Vec<&str> {
        self.scopes
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// A classified keychain blob.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredCredential {
    /// `basic:<email>:<apiToken>`. Either part may be empty when the blob is
    /// malformed; the requester rejects such credentials.
    Basic { username: String, password: String },
    /// An OAuth token envelope.
    OAuth(TokenEnvelope),
    /// A plain bearer token.
    Token(String),
}

impl StoredCredential {
    /// Classifies a blob.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_cloud_cli::auth::StoredCredential;
    ///
    /// assert!(matches!(
    ///     StoredCredential::classify("basic:me@example.com:tok"),
    ///     StoredCredential::Basic { .. }
    /// ));
    /// assert!(matches!(
    ///     StoredCredential::classify(r#"{"access_token":"T"}"#),
    ///     StoredCredential::OAuth(_)
    /// ));
    /// assert!(matches!(
    ///     StoredCredential::classify("plain-token"),
    ///     StoredCredential::Token(_)
    /// ));
    /// ```
    pub fn classify(blob: &str) -> Self {
        if let Some(rest) = blob.strip_prefix(BASIC_PREFIX) {
            let (username, password) = rest.split_once(':').unwrap_or((rest, ""));
            return Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            };
        }

        if let Ok(envelope) = serde_json::from_str::<TokenEnvelope>(blob) {
            if !envelope.access_token.is_empty() {
                return Self::OAuth(envelope);
            }
        }

        Self::Token(blob.to_string())
    }

    /// Encodes a Basic credential in its stored form.
    pub fn basic_blob(email: &str, api_token: &str) -> String {
        format!("{}{}:{}", BASIC_PREFIX, email, api_token)
    }

    /// The token sent as a bearer credential, if this is not Basic.
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Self::Basic { .. } => None,
            Self::OAuth(envelope) => Some(&envelope.access_token),
            Self::Token(token) => Some(token),
        }
    }

    /// Short name of the encoding, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::OAuth(_) => "oauth",
            Self::Token(_) => "token",
        }
    }
}

/// Reads a single token line, trimming surrounding whitespace.
///
/// # Errors
///
/// [`AuthError::EmptyToken`] if the line is empty after trimming.
pub fn read_token<R: BufRead>(mut reader: R) -> Result<String, AuthError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|_| AuthError::EmptyToken)?;
    let token = line.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token.to_string())
}

/// Reads a single token line from standard input.
pub fn read_token_from_stdin() -> Result<String, AuthError> {
    read_token(std::io::stdin().lock())
}

/// Masks a token for display (shows first and last 4 characters).
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
