//
//  bitbucket-cloud-cli
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Client Wrapper for Bitbucket API
//!
//! This module provides the HTTP client for the Bitbucket Cloud v2 API.
//!
//! ## Features
//!
//! - Bearer or HTTP Basic authentication on every request, Basic winning
//!   when both are configured
//! - `User-Agent: bb/<version>` and `Accept: application/json` on every
//!   request; `Content-Type` only when a body is sent
//! - Per-request timeout (30 seconds unless configured)
//! - Typed errors decoded from Bitbucket's error envelope
//! - Transparent pagination over absolute `next` links
//! - A `multipart/form-data` path for snippet uploads

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::common::{ApiError, PaginatedResponse};
use crate::auth::{Credential, CredentialKind};

/// Base URL of the Bitbucket Cloud v2 API.
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configures a [`BitbucketClient`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bitbucket_cloud_cli::api::BitbucketClient;
///
/// let client = BitbucketClient::builder()
///     .base_url("https://api.bitbucket.org/2.0/")
///     .bearer_token("my-token")
///     .timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(client.base_url(), "https://api.bitbucket.org/2.0");
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    bearer: Option<String>,
    basic: Option<(String, String)>,
    http: Option<Client>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Sets the API base URL. A trailing `/` is removed.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the credential presented on every request.
    pub fn credential(self, credential: &Credential) -> Self {
        match &credential.kind {
            CredentialKind::Bearer { token } => self.bearer_token(token.clone()),
            CredentialKind::Basic { username, password } => {
                self.basic_auth(username.clone(), password.clone())
            }
        }
    }

    /// Sets a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Sets Basic credentials. These take precedence over a bearer token.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some((username.into(), password.into()));
        self
    }

    /// Uses a caller-supplied transport.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidCredential`] when Basic credentials lack the email
    /// or the API token.
    pub fn build(self) -> Result<BitbucketClient, ApiError> {
        let auth = match (self.basic, self.bearer) {
            (Some((username, password)), _) => {
                if username.is_empty() || password.is_empty() {
                    return Err(ApiError::InvalidCredential(
                        "basic credential must have the form basic:<email>:<api-token>"
                            .to_string(),
                    ));
                }
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                Some(format!("Basic {}", encoded))
            }
            (None, Some(token)) => Some(format!("Bearer {}", token)),
            (None, None) => None,
        };

        let http = match self.http {
            Some(client) => client,
            None => Client::builder().build()?,
        };

        let base_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(BitbucketClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: auth,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

/// The HTTP client for the Bitbucket Cloud API.
///
/// # Example
///
/// ```rust,no_run
/// use bitbucket_cloud_cli::api::BitbucketClient;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = BitbucketClient::builder().bearer_token("my-token").build()?;
/// let user: serde_json::Value = client.get("/user").await?;
/// println!("{}", user["display_name"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BitbucketClient {
    http: Client,
    base_url: String,
    authorization: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for BitbucketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitbucketClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.authorization.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BitbucketClient {
    /// Starts configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a path against the base URL.
    ///
    /// Absolute `http(s)://` URLs are returned unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_cloud_cli::api::BitbucketClient;
    ///
    /// let client = BitbucketClient::builder().build().unwrap();
    /// assert_eq!(client.url("/user"), "https://api.bitbucket.org/2.0/user");
    /// assert_eq!(client.url("user"), "https://api.bitbucket.org/2.0/user");
    /// assert_eq!(client.url("https://example.com/x"), "https://example.com/x");
    /// ```
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method, url)
            .header(USER_AGENT, format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);

        if let Some(value) = &self.authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "api response");

        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Makes a GET request and decodes the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .send(self.request(Method::GET, path).query(query))
            .await?;
        Self::decode(response).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Self::decode(response).await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .send(self.request(Method::PUT, path).json(body))
            .await?;
        Self::decode(response).await
    }

    /// Makes a DELETE request, discarding the response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// Makes a request with an optional JSON body and returns the response
    /// as JSON. An empty response body yields `Value::Null`.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetches a single page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<PaginatedResponse<T>, ApiError> {
        self.get(path).await
    }

    /// Fetches every page of a list endpoint, following `next` links, and
    /// concatenates the values. A `next` link pointing at a page already
    /// fetched ends the walk.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use bitbucket_cloud_cli::api::BitbucketClient;
    ///
    /// # async fn example(client: &BitbucketClient) -> anyhow::Result<()> {
    /// let repos: Vec<serde_json::Value> = client.get_all("/repositories/myworkspace").await?;
    /// println!("{} repositories", repos.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut values = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next.take() {
            let page: PaginatedResponse<T> = self.get(&url).await?;
            visited.insert(url);
            next = page.next_url().map(str::to_string);
            values.extend(page.values);

            if let Some(url) = next.as_ref().filter(|url| visited.contains(*url)) {
                tracing::warn!(%url, "pagination link repeats an earlier page, stopping");
                next = None;
            }
        }
        Ok(values)
    }

    /// Makes a POST request with a `multipart/form-data` body.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::POST, path).multipart(form))
            .await?;
        Self::decode(response).await
    }

    /// Makes a PUT request with a `multipart/form-data` body.
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::PUT, path).multipart(form))
            .await?;
        Self::decode(response).await
    }
}
