//
//  bitbucket-cloud-cli
//  main.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bitbucket_cloud_cli::api::ApiError;
use bitbucket_cloud_cli::auth::AuthError;
use bitbucket_cloud_cli::cli::{Cli, Commands};
use bitbucket_cloud_cli::exit_codes;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    let result = run(cli).await;

    // Handle result and exit
    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = auth_error(&e).and_then(AuthError::hint) {
                eprintln!("{} {}", style("hint:").yellow(), hint);
            }
            std::process::exit(exit_code(&e));
        }
    }
}

/// Initialize logging based on environment
fn init_logging() {
    let filter = EnvFilter::try_from_env("BB_DEBUG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Main command dispatcher
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Auth(cmd) => cmd.run(&cli.global).await,
        Commands::Api(cmd) => cmd.run(&cli.global).await,
        Commands::Snippet(cmd) => cmd.run(&cli.global).await,
        Commands::Config(cmd) => cmd.run(&cli.global).await,
        Commands::Completion(cmd) => cmd.run(&cli.global).await,
        Commands::Version => {
            println!("bb version {}", bitbucket_cloud_cli::VERSION);
            Ok(())
        }
    }
}

fn auth_error(e: &anyhow::Error) -> Option<&AuthError> {
    e.chain().find_map(|cause| cause.downcast_ref::<AuthError>())
}

fn api_error(e: &anyhow::Error) -> Option<&ApiError> {
    e.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
}

fn exit_code(e: &anyhow::Error) -> i32 {
    if auth_error(e).is_some() {
        return exit_codes::AUTH_ERROR;
    }
    match api_error(e) {
        Some(ApiError::InvalidCredential(_)) => exit_codes::AUTH_ERROR,
        Some(err) if err.is_unauthorized() => exit_codes::AUTH_ERROR,
        Some(err) if err.is_not_found() => exit_codes::NOT_FOUND,
        Some(err) if err.is_rate_limited() => exit_codes::RATE_LIMIT,
        _ => exit_codes::ERROR,
    }
}
