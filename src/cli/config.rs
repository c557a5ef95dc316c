//
//  bitbucket-cloud-cli
//  cli/config.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI configuration commands
//!
//! Preferences live in `config.toml`. `git_protocol` is the exception: it is
//! a per-host setting stored in the host registry, so it needs a host that
//! has been logged in to.

use std::path::Path;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;

use crate::config::{config_dir, Config, Environment, GitProtocol, HostsFile, CONFIG_KEYS};
use crate::DEFAULT_HOST;

use super::GlobalOptions;

/// The registry-backed key.
const GIT_PROTOCOL: &str = "git_protocol";

/// Manage CLI configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get a configuration value
    Get(KeyArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Reset a configuration value to its default
    Unset(KeyArgs),

    /// List all configuration values
    #[command(visible_alias = "ls")]
    List,

    /// Show configuration file path
    Path,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Configuration key
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Configuration key
    pub key: String,

    /// Configuration value
    pub value: String,
}

impl ConfigCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let dir = config_dir(&Environment::process())?;
        let host = global.host();

        match &self.command {
            ConfigSubcommand::Get(args) => {
                let value = get_value(&dir, &host, &args.key)?;
                if global.json {
                    let result = serde_json::json!({ "key": args.key, "value": value });
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else if let Some(value) = value {
                    println!("{}", value);
                }
            }
            ConfigSubcommand::Set(args) => {
                set_value(&dir, &host, &args.key, &args.value)?;
                println!("{} Set {} to {}", style("✓").green(), args.key, args.value);
            }
            ConfigSubcommand::Unset(args) => {
                unset_value(&dir, &host, &args.key)?;
                println!("{} Reset {} to its default", style("✓").green(), args.key);
            }
            ConfigSubcommand::List => {
                let values = list_values(&dir, &host)?;
                if global.json {
                    let map: serde_json::Map<String, serde_json::Value> = values
                        .into_iter()
                        .map(|(k, v)| (k, v.map_or(serde_json::Value::Null, Into::into)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                } else {
                    for (key, value) in values {
                        println!("{}={}", key, value.unwrap_or_default());
                    }
                }
            }
            ConfigSubcommand::Path => {
                println!("{}", Config::path(&dir).display());
            }
        }
        Ok(())
    }
}

fn get_value(dir: &Path, host: &str, key: &str) -> Result<Option<String>> {
    if key == GIT_PROTOCOL {
        let registry = HostsFile::new(dir).load()?;
        return Ok(Some(registry.git_protocol(host).to_string()));
    }
    if !CONFIG_KEYS.contains(&key) {
        bail!(
            "Unknown configuration key '{}'. Valid keys: {}, {}",
            key,
            CONFIG_KEYS.join(", "),
            GIT_PROTOCOL
        );
    }
    Ok(Config::load(dir)?.get(key))
}

fn set_value(dir: &Path, host: &str, key: &str, value: &str) -> Result<()> {
    if key == GIT_PROTOCOL {
        let protocol: GitProtocol = value.parse()?;
        return set_git_protocol(dir, host, protocol);
    }

    let mut config = Config::load(dir)?;
    config.set(key, value)?;
    config.save(dir)
}

fn unset_value(dir: &Path, host: &str, key: &str) -> Result<()> {
    if key == GIT_PROTOCOL {
        return set_git_protocol(dir, host, GitProtocol::default());
    }

    let mut config = Config::load(dir)?;
    config.unset(key)?;
    config.save(dir)
}

fn set_git_protocol(dir: &Path, host: &str, protocol: GitProtocol) -> Result<()> {
    let known = HostsFile::new(dir).update(|registry| registry.set_git_protocol(host, protocol))?;
    if !known {
        let hint = if host == DEFAULT_HOST {
            String::new()
        } else {
            format!(" --hostname {}", host)
        };
        bail!(
            "{} is not a known host. Run 'bb auth login{}' first",
            host,
            hint
        );
    }
    Ok(())
}

fn list_values(dir: &Path, host: &str) -> Result<Vec<(String, Option<String>)>> {
    let config = Config::load(dir)?;
    let mut values: Vec<(String, Option<String>)> = CONFIG_KEYS
        .iter()
        .map(|key| (key.to_string(), config.get(key)))
        .collect();

    let registry = HostsFile::new(dir).load()?;
    values.push((
        GIT_PROTOCOL.to_string(),
        Some(registry.git_protocol(host).to_string()),
    ));
    Ok(values)
}
