//
//  bitbucket-cloud-cli
//  auth/oauth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # OAuth 2.0 Authentication Module
//!
//! Primitives of the OAuth 2.0 Authorization Code flow against Bitbucket
//! Cloud. [`AuthManager::login_oauth`](super::AuthManager::login_oauth)
//! strings them together.
//!
//! ## OAuth Flow Overview
//!
//! 1. **Generate state**: 128 random bits, lowercase hex ([`generate_state`])
//! 2. **Bind listener**: loopback TCP listener ([`CallbackListener::bind`])
//! 3. **Authorization request**: open the browser at
//!    [`OAuthConfig::authorize_url`]
//! 4. **Callback**: Bitbucket redirects to `http://localhost:<port>/callback`
//!    with `code` and `state` ([`CallbackListener::spawn`], [`await_callback`])
//! 5. **Token exchange**: the code is exchanged for a token envelope
//!    ([`OAuthConfig::exchange_code`])
//! 6. **Token refresh**: the refresh token obtains a new envelope
//!    ([`OAuthConfig::refresh`])
//!
//! ## Client Credentials
//!
//! The OAuth consumer is configured by the user (`BB_OAUTH_CLIENT_ID`,
//! `BB_OAUTH_CLIENT_SECRET`). Both are sent as HTTP Basic credentials to the
//! token endpoint. Bitbucket requires a registered callback URL, so the
//! listener port can be pinned with `oauth_callback_port` in `config.toml`
//! or `BB_OAUTH_CALLBACK_PORT`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::RngCore;
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use url::Url;

use super::{AuthError, TokenEnvelope};
use crate::config::{
    Config, Environment, BB_OAUTH_CALLBACK_PORT, BB_OAUTH_CLIENT_ID, BB_OAUTH_CLIENT_SECRET,
};

/// Bitbucket Cloud OAuth authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://bitbucket.org/site/oauth2/authorize";

/// Bitbucket Cloud OAuth token endpoint.
pub const TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Path served by the callback listener.
pub const CALLBACK_PATH: &str = "/callback";

/// How long the browser has to come back.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout of token exchange and refresh requests.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long one callback connection may take to send its request.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on header lines read from a callback request.
const MAX_HEADER_LINES: usize = 100;

const SUCCESS_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Authentication Successful</title></head>\
<body style=\"font-family: system-ui, sans-serif; text-align: center; padding: 50px;\">\
<h1>Authentication Successful</h1>\
<p>You can close this window and return to the terminal.</p>\
</body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Authentication Failed</title></head>\
<body style=\"font-family: system-ui, sans-serif; text-align: center; padding: 50px;\">\
<h1>Authentication Failed</h1>\
<p>The authorization was denied or an error occurred.</p>\
<p>Return to the terminal for details.</p>\
</body></html>";

/// OAuth consumer settings and endpoints.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::auth::OAuthConfig;
///
/// let config = OAuthConfig::new("cid", "csec");
/// let url = config
///     .authorize_url("http://localhost:8372/callback", "00ff")
///     .unwrap();
/// assert!(url.as_str().starts_with("https://bitbucket.org/site/oauth2/authorize?"));
/// assert!(url.as_str().contains("response_type=code"));
/// ```
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth consumer key.
    pub client_id: String,

    /// OAuth consumer secret.
    pub client_secret: String,

    /// Authorization endpoint.
    pub authorize_url: String,

    /// Token endpoint.
    pub token_url: String,

    /// Loopback port of the callback listener; `0` lets the kernel pick.
    pub callback_port: u16,

    /// How long to wait for the browser to come back.
    pub callback_timeout: Duration,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("callback_port", &self.callback_port)
            .field("callback_timeout", &self.callback_timeout)
            .finish()
    }
}

impl OAuthConfig {
    /// Settings for a consumer against the Bitbucket Cloud endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            callback_port: 0,
            callback_timeout: CALLBACK_TIMEOUT,
        }
    }

    /// Reads the consumer from the environment and the callback port from
    /// the environment or preferences.
    ///
    /// # Errors
    ///
    /// [`AuthError::ConfigurationMissing`] naming the first missing variable.
    pub fn from_env(env: &Environment, config: &Config) -> Result<Self, AuthError> {
        let client_id = env
            .var(BB_OAUTH_CLIENT_ID)
            .ok_or_else(|| AuthError::ConfigurationMissing(BB_OAUTH_CLIENT_ID.to_string()))?;
        let client_secret = env
            .var(BB_OAUTH_CLIENT_SECRET)
            .ok_or_else(|| AuthError::ConfigurationMissing(BB_OAUTH_CLIENT_SECRET.to_string()))?;

        let callback_port = match env.var(BB_OAUTH_CALLBACK_PORT) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value, "ignoring invalid {}", BB_OAUTH_CALLBACK_PORT);
                config.core.oauth_callback_port
            }),
            None => config.core.oauth_callback_port,
        };

        Ok(Self {
            callback_port,
            ..Self::new(client_id, client_secret)
        })
    }

    /// Builds the authorization URL the browser is sent to.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.authorize_url)
            .with_context(|| format!("Invalid authorize URL '{}'", self.authorize_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchanges an authorization code for a token envelope.
    ///
    /// `redirect_uri` must be byte-equal to the one sent in the
    /// authorization request.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenEnvelope> {
        tracing::debug!("exchanging authorization code");
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Obtains a new token envelope with a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenEnvelope> {
        tracing::debug!("refreshing access token");
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenEnvelope> {
        let client = Client::builder()
            .user_agent(format!("bb/{}", crate::VERSION))
            .timeout(EXCHANGE_TIMEOUT)
            .build()?;

        let response = client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .context("Failed to reach the OAuth token endpoint")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read token response")?;
        tracing::debug!(status = status.as_u16(), "token endpoint responded");

        if status != StatusCode::OK {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let envelope: TokenEnvelope =
            serde_json::from_str(&body).context("Failed to parse token response")?;
        if envelope.access_token.is_empty() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                body: "response did not include an access token".to_string(),
            }
            .into());
        }
        Ok(envelope)
    }
}

/// Generates a CSRF state value: 128 random bits as lowercase hex.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// The loopback listener that receives the authorization redirect.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    /// Binds `127.0.0.1:<port>`; port `0` lets the kernel choose.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind callback listener on port {}. Is another process using it?",
                    port
                )
            })?;
        let port = listener.local_addr()?.port();
        tracing::debug!(port, "callback listener bound");
        Ok(Self { listener, port })
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI for this listener.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, CALLBACK_PATH)
    }

    /// Serves requests until one reaches `GET /callback`, in a background
    /// task. The listener is closed when the task finishes or is aborted.
    pub fn spawn(self, expected_state: String) -> JoinHandle<Result<String>> {
        tokio::spawn(self.wait_for_code(expected_state))
    }

    /// Serves requests until one reaches `GET /callback` and returns its
    /// authorization code.
    ///
    /// Each connection is served in its own task and gets
    /// [`CONNECTION_TIMEOUT`] to send its request. Other paths are answered
    /// with 404, and connections that fail or stay idle are dropped; in both
    /// cases the wait continues.
    pub async fn wait_for_code(self, expected_state: String) -> Result<String> {
        let expected_state: Arc<str> = expected_state.into();
        let (outcome_tx, mut outcome_rx) = mpsc::channel(1);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.context("Callback listener failed")?;
                    tracing::debug!(%peer, "callback connection accepted");

                    let outcome_tx = outcome_tx.clone();
                    let expected_state = Arc::clone(&expected_state);
                    connections.spawn(async move {
                        match time::timeout(CONNECTION_TIMEOUT, serve_connection(stream, &expected_state)).await {
                            Ok(Ok(Some(outcome))) => {
                                let _ = outcome_tx.send(outcome).await;
                            }
                            Ok(Ok(None)) => {}
                            Ok(Err(e)) => tracing::debug!(%peer, error = %e, "callback connection failed"),
                            Err(_) => tracing::debug!(%peer, "callback connection idle, dropped"),
                        }
                    });
                }
                Some(outcome) = outcome_rx.recv() => {
                    return outcome.map_err(Into::into);
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }
}

/// Waits for the callback task, aborting it when `deadline` passes.
pub async fn await_callback(
    mut handle: JoinHandle<Result<String>>,
    deadline: Duration,
) -> Result<String> {
    match time::timeout(deadline, &mut handle).await {
        Ok(joined) => joined.context("Callback listener task failed")?,
        Err(_) => {
            handle.abort();
            tracing::debug!("callback deadline expired");
            Err(AuthError::AuthorizationTimeout.into())
        }
    }
}

/// Handles one HTTP request.
///
/// Returns `None` when the request was not for the callback path.
async fn serve_connection(
    mut stream: TcpStream,
    expected_state: &str,
) -> Result<Option<Result<String, AuthError>>> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let mut header = String::new();
    for _ in 0..MAX_HEADER_LINES {
        header.clear();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    let url = Url::parse(&format!("http://localhost{}", target)).ok();

    let Some(url) = url.filter(|u| method == "GET" && u.path() == CALLBACK_PATH) else {
        tracing::debug!(method, path = target.split('?').next(), "ignoring non-callback request");
        write_response(&mut writer, "404 Not Found", "Not Found").await?;
        return Ok(None);
    };

    let outcome = evaluate_callback(&url, expected_state);
    match &outcome {
        Ok(_) => {
            if let Err(e) = write_response(&mut writer, "200 OK", SUCCESS_PAGE).await {
                tracing::warn!(error = %e, "failed to send the success page to the browser");
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "callback rejected");
            write_response(&mut writer, "400 Bad Request", FAILURE_PAGE).await?
        }
    }
    Ok(Some(outcome))
}

async fn write_response<W>(writer: &mut W, status: &str, body: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Checks a callback URL against the issued state and extracts the code.
///
/// The state is checked first, then `error`, then `code`.
fn evaluate_callback(url: &Url, expected_state: &str) -> Result<String, AuthError> {
    let mut state = None;
    let mut code = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "state" => state = Some(value.into_owned()),
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::CsrfViolation);
    }
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        return Err(AuthError::AuthorizationDenied {
            error,
            description: description.filter(|d| !d.is_empty()),
        });
    }
    code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)
}
