//
//  bitbucket-cloud-cli
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common API Types
//!
//! Error and pagination types shared by every request the client makes.
//!
//! # Error Envelope
//!
//! Bitbucket Cloud reports failures as:
//!
//! ```json
//! {"type": "error", "error": {"message": "...", "detail": "...", "fields": {"name": ["..."]}}}
//! ```
//!
//! [`ApiError::from_response`] decodes that shape permissively: `fields`
//! values may be strings or lists of strings, and a body that does not
//! match falls back to the HTTP reason phrase.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

mod pagination;

pub use pagination::*;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by [`BitbucketClient`](crate::api::BitbucketClient).
///
/// | Variant | Raised when |
/// |---------|-------------|
/// | `Status` | the API answered with status 400 or above |
/// | `Transport` | the request could not be sent or the response not read |
/// | `InvalidCredential` | the client was built with an unusable credential |
/// | `Decode` | a success response did not match the expected type |
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API answered with an error status.
    #[error("{message} (HTTP {status}){}", with_detail(.detail))]
    Status {
        /// HTTP status code.
        status: u16,
        /// `error.message`, or the reason phrase.
        message: String,
        /// `error.detail`, or empty.
        detail: String,
        /// `error.fields`, when present.
        fields: Option<FieldErrors>,
    },

    /// A network-level failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The credential cannot be presented.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The response body did not decode.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

fn with_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    fields: Option<BTreeMap<String, Value>>,
}

impl ApiError {
    /// Builds the error for a response with status 400 or above.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_cloud_cli::api::ApiError;
    /// use reqwest::StatusCode;
    ///
    /// let err = ApiError::from_response(StatusCode::FORBIDDEN, "{}");
    /// match err {
    ///     ApiError::Status { status, message, detail, fields } => {
    ///         assert_eq!(status, 403);
    ///         assert_eq!(message, "Forbidden");
    ///         assert_eq!(detail, "");
    ///         assert!(fields.is_none());
    ///     }
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let reason = status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string();

        let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
            return Self::Status {
                status: status.as_u16(),
                message: reason,
                detail: String::new(),
                fields: None,
            };
        };

        let error = envelope.error;
        Self::Status {
            status: status.as_u16(),
            message: error.message.filter(|m| !m.is_empty()).unwrap_or(reason),
            detail: error.detail.map(value_to_text).unwrap_or_default(),
            fields: error.fields.map(normalize_fields),
        }
    }

    /// The HTTP status, for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API rejected the credential (401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether the resource does not exist (404).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the rate limit was hit (429).
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_fields(fields: BTreeMap<String, Value>) -> FieldErrors {
    fields
        .into_iter()
        .map(|(name, value)| {
            let messages = match value {
                Value::Array(items) => items.into_iter().map(value_to_text).collect(),
                other => vec![value_to_text(other)],
            };
            (name, messages)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_falls_back_to_reason() {
        let err = ApiError::from_response(StatusCode::FORBIDDEN, "{}");
        assert_eq!(err.to_string(), "Forbidden (HTTP 403)");
        assert!(matches!(
            err,
            ApiError::Status { status: 403, ref message, ref detail, fields: None }
                if message == "Forbidden" && detail.is_empty()
        ));
    }

    #[test]
    fn test_non_json_body_falls_back_to_reason() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, ApiError::Status { ref message, .. } if message == "Bad Gateway"));
    }

    #[test]
    fn test_cloud_error_envelope() {
        let body = r#"{"type":"error","error":{"message":"Repository not found","detail":"No repo named foo"}}"#;
        let err = ApiError::from_response(StatusCode::NOT_FOUND, body);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Repository not found (HTTP 404): No repo named foo"
        );
    }

    #[test]
    fn test_fields_accept_strings_and_lists() {
        let body = r#"{"type":"error","error":{"message":"Bad request","fields":{"name":"required","title":["too long","invalid"]}}}"#;
        let ApiError::Status { fields, .. } = ApiError::from_response(StatusCode::BAD_REQUEST, body)
        else {
            panic!("expected status error");
        };
        let fields = fields.unwrap();
        assert_eq!(fields["name"], vec!["required"]);
        assert_eq!(fields["title"], vec!["too long", "invalid"]);
    }

    #[test]
    fn test_status_helpers() {
        assert!(ApiError::from_response(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, "").is_rate_limited());
        assert_eq!(ApiError::Decode("x".into()).status(), None);
    }
}
