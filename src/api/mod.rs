//
//  bitbucket-cloud-cli
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! HTTP access to the Bitbucket Cloud REST API (v2.0 at
//! `api.bitbucket.org`).
//!
//! ## Architecture
//!
//! - [`client`]: The authenticated HTTP client and its builder
//! - [`common`]: Error envelope and pagination types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bitbucket_cloud_cli::api::BitbucketClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = BitbucketClient::builder().bearer_token("your-token").build()?;
//! let repos: Vec<serde_json::Value> = client.get_all("/repositories/myworkspace").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Clients for a logged-in account come from
//! [`AuthManager::authenticated_client`](crate::auth::AuthManager::authenticated_client).
//!
//! ## Error Handling
//!
//! Every failure is an [`ApiError`]. Responses with status 400 or above
//! become [`ApiError::Status`] carrying the status code, message, detail
//! and field errors from Bitbucket's error envelope.

pub mod client;
pub mod common;

pub use client::{BitbucketClient, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use common::{ApiError, FieldErrors, PaginatedResponse};
