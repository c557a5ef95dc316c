//
//  bitbucket-cloud-cli
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Direct API access command
//!
//! Makes authenticated requests to any Bitbucket Cloud endpoint, similar to
//! `gh api` for GitHub. The credential is the one `bb auth status` reports.
//!
//! ## Examples
//!
//! ```bash
//! # Get repository info
//! bb api /repositories/workspace/repo
//!
//! # Create an issue with POST
//! bb api -X POST /repositories/workspace/repo/issues \
//!     -F title="Bug report" -F content.raw="Description here"
//!
//! # Paginate through results
//! bb api /repositories/workspace/repo/commits --paginate
//! ```

use std::fs;
use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Args;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::auth::AuthManager;

use super::GlobalOptions;

/// Make direct API requests
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// API endpoint, relative to https://api.bitbucket.org/2.0 or absolute
    pub endpoint: String,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Typed body field key=value (true, false, null, numbers and JSON are decoded)
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// String body field key=value
    #[arg(long, short = 'f', action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Read the JSON request body from a file (- for stdin)
    #[arg(long, conflicts_with_all = ["field", "raw_field"])]
    pub input: Option<String>,

    /// Follow `next` links and print every value
    #[arg(long)]
    pub paginate: bool,
}

impl ApiCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let method = parse_method(&self.method)?;
        if self.paginate && method != Method::GET {
            bail!("--paginate can only be used with GET requests");
        }
        let body = self.build_body()?;
        let endpoint = normalize_endpoint(&self.endpoint);

        let manager = AuthManager::from_environment()?;
        let client = manager.authenticated_client(&global.host()).await?;

        let output = if self.paginate {
            let values: Vec<Value> = client.get_all(&endpoint).await?;
            serde_json::json!({
                "size": values.len(),
                "values": values,
            })
        } else {
            client
                .request_json(method, &endpoint, body.as_ref())
                .await?
        };

        if !output.is_null() {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Ok(())
    }

    fn build_body(&self) -> Result<Option<Value>> {
        if let Some(input) = &self.input {
            let content = if input == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
            };
            let value = serde_json::from_str(&content).context("Request body is not valid JSON")?;
            return Ok(Some(value));
        }

        build_fields(&self.field, &self.raw_field)
    }
}

fn parse_method(method: &str) -> Result<Method> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => bail!("Unsupported HTTP method: {}", method),
    }
}

/// Strips a leading `/2.0` so both `/2.0/user` and `/user` work. Absolute
/// URLs are left alone.
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let trimmed = endpoint.trim_start_matches('/');
    let trimmed = trimmed.strip_prefix("2.0").unwrap_or(trimmed);
    format!("/{}", trimmed.trim_start_matches('/'))
}

fn build_fields(typed: &[String], raw: &[String]) -> Result<Option<Value>> {
    if typed.is_empty() && raw.is_empty() {
        return Ok(None);
    }

    let mut body = Map::new();
    for field in typed {
        let (key, value) = split_field(field)?;
        set_nested_value(&mut body, key, decode_value(value));
    }
    for field in raw {
        let (key, value) = split_field(field)?;
        set_nested_value(&mut body, key, Value::String(value.to_string()));
    }
    Ok(Some(Value::Object(body)))
}

fn split_field(field: &str) -> Result<(&str, &str)> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("Invalid field format: {}. Expected key=value", field),
    }
}

fn decode_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Number(n.into())
            } else if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Value::Number(n)
            } else if raw.starts_with('[') || raw.starts_with('{') {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

/// Inserts `value` at a dotted key path, creating objects along the way.
fn set_nested_value(obj: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let entry = obj
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                set_nested_value(nested, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert!(parse_method("TRACE").is_err());
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/2.0/user"), "/user");
        assert_eq!(normalize_endpoint("user"), "/user");
        assert_eq!(normalize_endpoint("/repositories/ws"), "/repositories/ws");
        assert_eq!(
            normalize_endpoint("https://api.bitbucket.org/2.0/user"),
            "https://api.bitbucket.org/2.0/user"
        );
    }

    #[test]
    fn test_build_fields_nested_and_typed() {
        let typed = vec![
            "title=Bug".to_string(),
            "content.raw=Details".to_string(),
            "is_private=true".to_string(),
            "priority=3".to_string(),
        ];
        let raw = vec!["version=1.0".to_string()];
        let body = build_fields(&typed, &raw).unwrap().unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Bug",
                "content": {"raw": "Details"},
                "is_private": true,
                "priority": 3,
                "version": "1.0"
            })
        );
    }

    #[test]
    fn test_no_fields_means_no_body() {
        assert_eq!(build_fields(&[], &[]).unwrap(), None);
    }

    #[test]
    fn test_field_without_equals_is_rejected() {
        assert!(build_fields(&["title".to_string()], &[]).is_err());
    }

    #[test]
    fn test_decode_json_value() {
        assert_eq!(decode_value(r#"["a","b"]"#), json!(["a", "b"]));
        assert_eq!(decode_value("{not json"), json!("{not json"));
        assert_eq!(decode_value("null"), Value::Null);
    }
}
