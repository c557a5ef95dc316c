//
//  bitbucket-cloud-cli
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI command definitions using clap derive macros

mod api;
mod auth;
mod completion;
mod config;
mod snippet;

pub use api::ApiCommand;
pub use auth::AuthCommand;
pub use completion::CompletionCommand;
pub use config::ConfigCommand;
pub use snippet::SnippetCommand;

use clap::{Parser, Subcommand};

use crate::auth::AuthManager;
use crate::config::normalize_host;
use crate::DEFAULT_HOST;

/// Bitbucket Cloud CLI - Work with Bitbucket Cloud from the command line
#[derive(Parser, Debug)]
#[command(
    name = "bb",
    version,
    about = "Work with Bitbucket Cloud from the command line",
    long_about = "bb signs you in to Bitbucket Cloud with OAuth 2.0 or an access token,\n\
                  keeps your credentials in the system keychain, and gives scripts\n\
                  authenticated access to the Bitbucket REST API.",
    propagate_version = true,
    after_help = "Use 'bb <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// The Bitbucket host to act on
    #[arg(long, global = true, value_name = "HOST")]
    pub hostname: Option<String>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable interactive prompts
    #[arg(long, global = true, env = "BB_NO_PROMPT")]
    pub no_prompt: bool,
}

impl GlobalOptions {
    /// The selected host, normalized, defaulting to `bitbucket.org`.
    pub fn host(&self) -> String {
        self.hostname
            .as_deref()
            .map(normalize_host)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Whether interactive prompts may be shown.
    pub fn prompts_allowed(&self, manager: &AuthManager) -> bool {
        !self.no_prompt && manager.config().prompts_enabled() && console::user_attended()
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Bitbucket
    Auth(AuthCommand),

    /// Make authenticated API requests
    Api(ApiCommand),

    /// Manage snippets
    Snippet(SnippetCommand),

    /// Manage CLI configuration
    Config(ConfigCommand),

    /// Generate shell completion scripts
    Completion(CompletionCommand),

    /// Print version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_host_defaults_to_bitbucket_org() {
        let global = GlobalOptions::default();
        assert_eq!(global.host(), "bitbucket.org");

        let global = GlobalOptions {
            hostname: Some("https://Bitbucket.org/".into()),
            ..Default::default()
        };
        assert_eq!(global.host(), "bitbucket.org");
    }

    #[test]
    fn test_hostname_is_global() {
        let cli = Cli::try_parse_from(["bb", "auth", "status", "--hostname", "example.org"]).unwrap();
        assert_eq!(cli.global.hostname.as_deref(), Some("example.org"));
    }
}
