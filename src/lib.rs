//
//  bitbucket-cloud-cli
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Bitbucket Cloud CLI Library
//!
//! The library behind the `bb` command. Its centre is the authentication
//! subsystem: an OAuth 2.0 Authorization Code login with a loopback redirect
//! listener, credential persistence in the system keychain, a per-host
//! registry of signed-in accounts, and an HTTP requester that presents the
//! right credential on every call to the Bitbucket Cloud v2 API.
//!
//! ## Module Structure
//!
//! - [`auth`]: Secret store, credential resolution, OAuth login and account lifecycle
//! - [`api`]: Authenticated HTTP requester, error and pagination envelopes
//! - [`config`]: Config directory resolution, host registry and user preferences
//! - [`cli`]: Command-line interface definitions using clap
//! - [`util`]: Small helpers shared by the commands
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bitbucket_cloud_cli::auth::AuthManager;
//! use bitbucket_cloud_cli::DEFAULT_HOST;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let manager = AuthManager::from_environment()?;
//! let client = manager.authenticated_client(DEFAULT_HOST).await?;
//! let user: serde_json::Value = client.get("/user").await?;
//! println!("{}", user["username"]);
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions.
pub mod cli;

/// HTTP requester for the Bitbucket Cloud API.
///
/// Attaches the resolved credential, decodes JSON and error envelopes,
/// follows pagination links and sends multipart bodies.
pub mod api;

/// Authentication and credential lifecycle.
///
/// - Secret store adapter over the system keychain
/// - Credential resolution from environment and keychain
/// - OAuth 2.0 Authorization Code login with a loopback listener
/// - Login, logout, switch, status and token refresh
pub mod auth;

/// Configuration management.
///
/// Resolves the configuration directory and manages the files stored in it:
/// - `hosts.yml`: the host registry of signed-in accounts
/// - `config.toml`: user preferences
pub mod config;

/// Utility functions and helpers.
pub mod util;

pub use api::BitbucketClient;
pub use auth::{AuthManager, Credential};
pub use cli::Cli;
pub use config::Config;

/// Application name constant.
///
/// Used in the User-Agent, the configuration directory name and the
/// keychain namespace.
pub const APP_NAME: &str = "bb";

/// Application version constant, taken from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The Bitbucket Cloud host every command targets unless told otherwise.
pub const DEFAULT_HOST: &str = "bitbucket.org";

/// Exit codes for the CLI.
///
/// Standardized exit codes following Unix conventions, allowing scripts
/// to programmatically detect the outcome of CLI operations.
///
/// # Example
///
/// ```rust,no_run
/// use bitbucket_cloud_cli::exit_codes;
/// use std::process;
///
/// process::exit(exit_codes::AUTH_ERROR);
/// ```
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;

    /// General error. Check stderr for details.
    pub const ERROR: i32 = 1;

    /// Authentication required or failed.
    ///
    /// The user is not authenticated, the token is invalid, or the login
    /// flow was aborted. Run `bb auth login` to authenticate.
    pub const AUTH_ERROR: i32 = 4;

    /// Resource not found.
    pub const NOT_FOUND: i32 = 8;

    /// API rate limit exceeded.
    pub const RATE_LIMIT: i32 = 32;
}
