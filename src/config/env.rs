//
//  bitbucket-cloud-cli
//  config/env.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Environment Access
//!
//! Every environment variable the CLI consumes is read through
//! [`Environment`]. Production code uses the live process environment;
//! tests hand in a fixed map so precedence rules can be exercised without
//! touching global process state.
//!
//! Empty values are treated exactly like unset ones.

use std::collections::HashMap;

/// Highest-priority bearer token; bypasses the keychain.
pub const BB_TOKEN: &str = "BB_TOKEN";

/// Second-priority bearer token; bypasses the keychain.
pub const BITBUCKET_TOKEN: &str = "BITBUCKET_TOKEN";

/// OAuth consumer key used by the browser login.
pub const BB_OAUTH_CLIENT_ID: &str = "BB_OAUTH_CLIENT_ID";

/// OAuth consumer secret used by the browser login and token refresh.
pub const BB_OAUTH_CLIENT_SECRET: &str = "BB_OAUTH_CLIENT_SECRET";

/// Overrides the loopback port of the OAuth callback listener.
pub const BB_OAUTH_CALLBACK_PORT: &str = "BB_OAUTH_CALLBACK_PORT";

/// Overrides the configuration directory.
pub const BB_CONFIG_DIR: &str = "BB_CONFIG_DIR";

/// Browser command preferred over `BROWSER`.
pub const BB_BROWSER: &str = "BB_BROWSER";

/// Source of environment variables.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::config::Environment;
///
/// let env = Environment::fixed([("BB_TOKEN", "abc"), ("BITBUCKET_TOKEN", "")]);
/// assert_eq!(env.var("BB_TOKEN").as_deref(), Some("abc"));
/// assert_eq!(env.var("BITBUCKET_TOKEN"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// The environment of the running process.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

impl Environment {
    /// The live process environment.
    pub fn process() -> Self {
        Self::Process
    }

    /// A fixed environment built from key/value pairs.
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the value of `key`, or `None` when it is unset or empty.
    pub fn var(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}
