//
//  bitbucket-cloud-cli
//  cli/completion.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Shell completion commands

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use super::{Cli, GlobalOptions};

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionCommand {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionCommand {
    pub async fn run(&self, _global: &GlobalOptions) -> Result<()> {
        let mut cmd = Cli::command();
        generate(self.shell, &mut cmd, crate::APP_NAME, &mut std::io::stdout());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_shell() {
        let cli = Cli::try_parse_from(["bb", "completion", "zsh"]).unwrap();
        let super::super::Commands::Completion(cmd) = cli.command else {
            panic!("expected completion command");
        };
        assert_eq!(cmd.shell, Shell::Zsh);
    }

    #[test]
    fn test_unknown_shell_is_rejected() {
        assert!(Cli::try_parse_from(["bb", "completion", "tcsh"]).is_err());
    }
}
