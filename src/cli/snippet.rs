//
//  bitbucket-cloud-cli
//  cli/snippet.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Snippet commands
//!
//! Snippets are created and updated with `multipart/form-data` bodies: one
//! `file` part per file plus `title` and `is_private` text parts.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use console::style;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::api::BitbucketClient;
use crate::auth::AuthManager;

use super::GlobalOptions;

/// Manage snippets
#[derive(Args, Debug)]
pub struct SnippetCommand {
    #[command(subcommand)]
    pub command: SnippetSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SnippetSubcommand {
    /// Create a snippet from files
    Create(CreateArgs),

    /// Replace the files or title of a snippet
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Workspace that owns the snippet
    #[arg(long, short = 'w')]
    pub workspace: String,

    /// Snippet title
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Make the snippet private
    #[arg(long)]
    pub private: bool,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Workspace that owns the snippet
    #[arg(long, short = 'w')]
    pub workspace: String,

    /// Snippet ID
    pub id: String,

    /// New snippet title
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Files to upload
    pub files: Vec<PathBuf>,
}

impl SnippetCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let manager = AuthManager::from_environment()?;
        let client = manager.authenticated_client(&global.host()).await?;

        let (verb, snippet) = match &self.command {
            SnippetSubcommand::Create(args) => {
                let form = build_form(args.title.as_deref(), Some(args.private), &args.files)?;
                ("Created", create_snippet(&client, &args.workspace, form).await?)
            }
            SnippetSubcommand::Update(args) => {
                if args.title.is_none() && args.files.is_empty() {
                    bail!("Nothing to update. Pass --title or at least one file");
                }
                let form = build_form(args.title.as_deref(), None, &args.files)?;
                (
                    "Updated",
                    update_snippet(&client, &args.workspace, &args.id, form).await?,
                )
            }
        };

        if global.json {
            println!("{}", serde_json::to_string_pretty(&snippet)?);
        } else {
            println!(
                "{} {} snippet {}",
                style("✓").green(),
                verb,
                snippet["id"].as_str().unwrap_or_default()
            );
            if let Some(url) = snippet["links"]["html"]["href"].as_str() {
                println!("  {}", url);
            }
        }
        Ok(())
    }
}

/// Builds the multipart body of a snippet request.
fn build_form(title: Option<&str>, private: Option<bool>, files: &[PathBuf]) -> Result<Form> {
    let mut form = Form::new();
    if let Some(title) = title {
        form = form.text("title", title.to_string());
    }
    if let Some(private) = private {
        form = form.text("is_private", private.to_string());
    }
    for path in files {
        form = form.part("file", file_part(path)?);
    }
    Ok(form)
}

fn file_part(path: &Path) -> Result<Part> {
    let contents =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    Ok(Part::bytes(contents).file_name(name))
}

async fn create_snippet(client: &BitbucketClient, workspace: &str, form: Form) -> Result<Value> {
    Ok(client
        .post_multipart(&format!("/snippets/{}", workspace), form)
        .await?)
}

async fn update_snippet(
    client: &BitbucketClient,
    workspace: &str,
    id: &str,
    form: Form,
) -> Result<Value> {
    Ok(client
        .put_multipart(&format!("/snippets/{}/{}", workspace, id), form)
        .await?)
}
