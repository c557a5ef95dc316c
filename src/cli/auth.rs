//
//  bitbucket-cloud-cli
//  cli/auth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Authentication commands for the Bitbucket CLI.
//!
//! Every subcommand acts on one host, `bitbucket.org` unless `--hostname`
//! says otherwise. Credentials live in the system keychain, the list of
//! signed-in accounts in `hosts.yml`.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use serde_json::json;
use url::Url;

use crate::auth::{mask_token, AuthManager, AuthStatus, Credential, UserIdentity};
use crate::config::normalize_host;
use crate::util::{format_duration, open_browser, spinner};
use crate::DEFAULT_HOST;

use super::GlobalOptions;

/// Authenticate with Bitbucket.
#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Log in to Bitbucket
    Login(LoginArgs),

    /// Log out of Bitbucket
    Logout(LogoutArgs),

    /// View authentication status
    Status(StatusArgs),

    /// Switch the active account of a host
    Switch(SwitchArgs),

    /// Print the authentication token
    Token,

    /// Refresh the OAuth token of the active account
    Refresh,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Read a token from standard input instead of using the browser
    #[arg(long)]
    pub with_token: bool,

    /// Atlassian account email; the token read from stdin is an API token
    #[arg(long, requires = "with_token")]
    pub email: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// The account to log out (defaults to the active account)
    #[arg(long, short = 'u')]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show the authentication token (masked)
    #[arg(long, short = 't')]
    pub show_token: bool,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// The account to make active
    pub user: Option<String>,
}

impl AuthCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let manager = AuthManager::from_environment()?;
        match &self.command {
            AuthSubcommand::Login(args) => login(&manager, args, global).await,
            AuthSubcommand::Logout(args) => logout(&manager, args, global),
            AuthSubcommand::Status(args) => status(&manager, args, global).await,
            AuthSubcommand::Switch(args) => switch(&manager, args, global),
            AuthSubcommand::Token => token(&manager, global).await,
            AuthSubcommand::Refresh => refresh(&manager, global).await,
        }
    }
}

/// Performs the login flow.
async fn login(manager: &AuthManager, args: &LoginArgs, global: &GlobalOptions) -> Result<()> {
    let host = global.host();

    let identity = if args.with_token {
        let stdin = std::io::stdin();
        match &args.email {
            Some(email) => {
                manager
                    .login_with_api_token(&host, email, stdin.lock())
                    .await?
            }
            None => manager.login_with_token(&host, stdin.lock()).await?,
        }
    } else {
        let browser = manager.config().core.browser.clone();
        let env = manager.env();
        let waiting = spinner("Waiting for authorization in the browser...");
        let opener = |url: &Url| {
            waiting.suspend(|| {
                eprintln!("{} Opening {} in your browser.", style("!").yellow(), host);
                if let Err(e) = open_browser(url.as_str(), browser.as_deref(), env) {
                    tracing::debug!(error = %e, "browser launch failed");
                    eprintln!("Could not open a browser. Open this URL to continue:");
                    eprintln!("  {}", url);
                }
            });
            Ok(())
        };
        let result = manager.login_oauth(&host, opener).await;
        waiting.finish_and_clear();
        result?
    };

    println!("{}", logged_in_line(&identity));
    Ok(())
}

fn logged_in_line(identity: &UserIdentity) -> String {
    format!("{} Logged in as {}", style("✓").green(), identity.username)
}

/// Performs logout.
fn logout(manager: &AuthManager, args: &LogoutArgs, global: &GlobalOptions) -> Result<()> {
    let host = global.host();
    match manager.logout(&host, args.user.as_deref())? {
        Some(user) => println!("{} Logged out of {} as {}", style("✓").green(), host, user),
        None => match &args.user {
            Some(user) => println!("{} {} is not logged in to {}", style("!").yellow(), user, host),
            None => println!("{} Not logged in to {}", style("!").yellow(), host),
        },
    }
    Ok(())
}

/// Shows authentication status.
async fn status(manager: &AuthManager, args: &StatusArgs, global: &GlobalOptions) -> Result<()> {
    let hosts = status_hosts(manager, global)?;

    if hosts.is_empty() {
        if global.json {
            println!("[]");
        } else {
            println!("Not logged in to any Bitbucket hosts");
            println!();
            println!("Run 'bb auth login' to authenticate");
        }
        return Ok(());
    }

    let registry = manager.hosts().load()?;
    let mut reports = Vec::new();
    for host in &hosts {
        let status = manager.status(host).await;
        if global.json {
            reports.push(status_json(host, &status));
        } else {
            for line in describe_status(host, &status, args.show_token) {
                println!("{}", line);
            }
            println!("  Git protocol: {}", registry.git_protocol(host));
            println!();
        }
    }

    if global.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

/// The hosts `status` reports on: the given host, or every signed-in host.
fn status_hosts(manager: &AuthManager, global: &GlobalOptions) -> Result<Vec<String>> {
    if let Some(host) = &global.hostname {
        return Ok(vec![normalize_host(host)]);
    }

    let registry = manager.hosts().load()?;
    let mut hosts: Vec<String> = registry
        .authenticated_hosts()
        .into_iter()
        .map(str::to_string)
        .collect();
    if hosts.is_empty() && manager.resolver().from_environment().is_some() {
        hosts.push(DEFAULT_HOST.to_string());
    }
    Ok(hosts)
}

fn describe_status(host: &str, status: &AuthStatus, show_token: bool) -> Vec<String> {
    let mut lines = vec![host.to_string()];
    match status {
        AuthStatus::LoggedIn {
            user,
            source,
            credential,
        } => {
            lines.push(format!(
                "  {} Logged in as {} ({})",
                style("✓").green(),
                user,
                source
            ));
            if show_token {
                lines.push(format!("  Token: {}", mask_token(credential.secret())));
            }
        }
        AuthStatus::TokenInvalid {
            user,
            source,
            reason,
        } => {
            let who = user.as_deref().unwrap_or("unknown user");
            lines.push(format!(
                "  {} Token invalid for {} ({}): {}",
                style("X").red(),
                who,
                source,
                reason
            ));
            lines.push("  Run 'bb auth login' to re-authenticate".to_string());
        }
        AuthStatus::NotLoggedIn { reason } => {
            let mut line = format!("  {} Not logged in", style("!").yellow());
            if let Some(reason) = reason {
                line.push_str(&format!(": {}", reason));
            }
            lines.push(line);
        }
    }
    lines
}

fn status_json(host: &str, status: &AuthStatus) -> serde_json::Value {
    match status {
        AuthStatus::LoggedIn { user, source, .. } => json!({
            "host": host,
            "state": "logged_in",
            "user": user,
            "source": source.to_string(),
        }),
        AuthStatus::TokenInvalid {
            user,
            source,
            reason,
        } => json!({
            "host": host,
            "state": "token_invalid",
            "user": user,
            "source": source.to_string(),
            "reason": reason,
        }),
        AuthStatus::NotLoggedIn { reason } => json!({
            "host": host,
            "state": "not_logged_in",
            "reason": reason,
        }),
    }
}

/// Switches the active account.
fn switch(manager: &AuthManager, args: &SwitchArgs, global: &GlobalOptions) -> Result<()> {
    let host = global.host();

    let user = match &args.user {
        Some(user) => user.clone(),
        None => {
            let registry = manager.hosts().load()?;
            let users: Vec<String> = registry.users(&host).into_iter().map(str::to_string).collect();
            if users.is_empty() {
                bail!("Not logged in to {}. Run 'bb auth login' first", host);
            }
            if !global.prompts_allowed(manager) {
                bail!(
                    "Specify the account to switch to. Accounts on {}: {}",
                    host,
                    users.join(", ")
                );
            }

            let active = registry.active_user(&host);
            let default = users
                .iter()
                .position(|u| Some(u.as_str()) == active)
                .unwrap_or(0);
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Account to use on {}", host))
                .items(&users)
                .default(default)
                .interact()?;
            users[selection].clone()
        }
    };

    manager.switch(&host, &user)?;
    println!(
        "{} Switched active account for {} to {}",
        style("✓").green(),
        host,
        user
    );
    Ok(())
}

/// Prints the token of the active credential.
async fn token(manager: &AuthManager, global: &GlobalOptions) -> Result<()> {
    let host = global.host();
    let user = manager.active_user(&host)?;
    let credential = manager.credential(&host, user.as_deref()).await?;

    // Bare output so it can be piped.
    println!("{}", bearer_token(&credential, &host)?);
    Ok(())
}

/// The bearer token of a credential. API tokens used with Basic
/// authentication are not printed.
fn bearer_token<'a>(credential: &'a Credential, host: &str) -> Result<&'a str> {
    match credential.token() {
        Some(token) => Ok(token),
        None => bail!(
            "The credential for {} is an API token used with Basic authentication, not a bearer token. Run 'bb auth login' to use OAuth",
            host
        ),
    }
}

/// Refreshes the OAuth token.
async fn refresh(manager: &AuthManager, global: &GlobalOptions) -> Result<()> {
    let host = global.host();
    let envelope = manager.refresh(&host).await?;

    println!("{} Token refreshed for {}", style("✓").green(), host);
    if let Some(expires_in) = envelope.expires_in {
        println!(
            "  New token expires in {}",
            format_duration(Duration::from_secs(expires_in))
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialSource;

    fn plain(lines: Vec<String>) -> Vec<String> {
        lines
            .into_iter()
            .map(|l| console::strip_ansi_codes(&l).to_string())
            .collect()
    }

    #[test]
    fn test_bearer_token_refuses_basic_credential() {
        let bearer = Credential::bearer("T", CredentialSource::Keyring);
        assert_eq!(bearer_token(&bearer, "bitbucket.org").unwrap(), "T");

        let basic = Credential::basic("alice@example.com", "apitok", CredentialSource::Keyring);
        let err = bearer_token(&basic, "bitbucket.org").unwrap_err();
        assert!(err.to_string().contains("Basic authentication"));
        assert!(!err.to_string().contains("apitok"));
    }

    #[test]
    fn test_logged_in_line() {
        let identity = UserIdentity {
            username: "alice".into(),
            uuid: String::new(),
            display_name: String::new(),
        };
        let line = console::strip_ansi_codes(&logged_in_line(&identity)).to_string();
        assert!(line.ends_with("Logged in as alice"));
    }

    #[test]
    fn test_describe_logged_in_masks_token() {
        let status = AuthStatus::LoggedIn {
            user: "alice".into(),
            source: CredentialSource::Keyring,
            credential: Credential::bearer("abcdefghijklmnop", CredentialSource::Keyring),
        };
        let lines = plain(describe_status("bitbucket.org", &status, true));
        assert_eq!(lines[0], "bitbucket.org");
        assert!(lines[1].contains("Logged in as alice (keyring)"));
        assert_eq!(lines[2], "  Token: abcd...mnop");
    }

    #[test]
    fn test_describe_environment_source() {
        let status = AuthStatus::LoggedIn {
            user: "ci".into(),
            source: CredentialSource::Environment,
            credential: Credential::bearer("t", CredentialSource::Environment),
        };
        let lines = plain(describe_status("bitbucket.org", &status, false));
        assert!(lines[1].contains("(environment)"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_describe_invalid_and_missing() {
        let invalid = AuthStatus::TokenInvalid {
            user: Some("alice".into()),
            source: CredentialSource::Keyring,
            reason: "Unauthorized (HTTP 401)".into(),
        };
        let lines = plain(describe_status("bitbucket.org", &invalid, false));
        assert!(lines[1].contains("Token invalid for alice"));

        let missing = AuthStatus::NotLoggedIn { reason: None };
        let lines = plain(describe_status("bitbucket.org", &missing, false));
        assert!(lines[1].ends_with("Not logged in"));
    }

    #[test]
    fn test_status_json_states() {
        let missing = status_json("bitbucket.org", &AuthStatus::NotLoggedIn { reason: None });
        assert_eq!(missing["state"], "not_logged_in");
        assert_eq!(missing["host"], "bitbucket.org");
    }
}
