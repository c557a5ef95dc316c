//
//  bitbucket-cloud-cli
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Resolves the configuration directory and manages the two files stored in
//! it: the host registry (`hosts.yml`, see [`hosts`]) and the user
//! preferences (`config.toml`, see [`Config`]).
//!
//! ## Configuration Directory
//!
//! The first of these that is set wins:
//!
//! 1. `$BB_CONFIG_DIR`
//! 2. `$XDG_CONFIG_HOME/bb`
//! 3. `$HOME/.config/bb`
//!
//! ## Example Preferences File
//!
//! ```toml
//! [core]
//! browser = "firefox"
//! oauth_callback_port = 8372
//! http_timeout = 30
//! prompt = "enabled"
//! ```
//!
//! ## Submodules
//!
//! - [`env`]: Environment variable access
//! - [`file`]: Low-level configuration file I/O operations
//! - [`hosts`]: The host registry

mod env;
mod file;
mod hosts;

pub use env::*;
pub use file::*;
pub use hosts::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::APP_NAME;

/// File name of the preferences file inside the configuration directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const CONFIG_KEYS: &[&str] = &["browser", "oauth_callback_port", "http_timeout", "prompt"];

/// Resolves the configuration directory.
///
/// # Example
///
/// ```rust
/// use std::path::PathBuf;
/// use bitbucket_cloud_cli::config::{config_dir, Environment};
///
/// let env = Environment::fixed([("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/me")]);
/// assert_eq!(config_dir(&env).unwrap(), PathBuf::from("/xdg/bb"));
/// ```
pub fn config_dir(env: &Environment) -> Result<PathBuf> {
    if let Some(dir) = env.var(BB_CONFIG_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = env.var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_NAME));
    }
    let home = env
        .var("HOME")
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory; set BB_CONFIG_DIR"))?;
    Ok(home.join(".config").join(APP_NAME))
}

/// User preferences stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Core CLI preferences.
    #[serde(default)]
    pub core: CoreConfig,
}

/// Core preferences.
///
/// | Field | Default |
/// |-------|---------|
/// | `browser` | `None` (uses `$BB_BROWSER`, `$BROWSER`, then the system default) |
/// | `oauth_callback_port` | `0` (kernel-assigned) |
/// | `http_timeout` | `30` seconds |
/// | `prompt` | `"enabled"` |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Browser command used to open the authorization page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Loopback port of the OAuth callback listener.
    ///
    /// Must match the callback URL registered for the OAuth consumer.
    /// `0` lets the kernel pick a free port.
    #[serde(default)]
    pub oauth_callback_port: u16,

    /// Per-request timeout of API calls, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Whether interactive prompts may be shown ("enabled" or "disabled").
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_http_timeout() -> u64 {
    30
}

fn default_prompt() -> String {
    "enabled".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            browser: None,
            oauth_callback_port: 0,
            http_timeout: default_http_timeout(),
            prompt: default_prompt(),
        }
    }
}

impl Config {
    /// Loads preferences from `config_dir`. A missing file yields defaults.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = Self::path(config_dir);
        match read_config_file(&path)? {
            Some(content) => toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display())),
            None => Ok(Self::default()),
        }
    }

    /// Saves preferences to `config_dir`.
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        write_config_file(&Self::path(config_dir), &content, 0o644)
    }

    /// Path of `config.toml` inside `config_dir`.
    pub fn path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE)
    }

    /// The per-request API timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.core.http_timeout)
    }

    /// Whether interactive prompts are allowed.
    pub fn prompts_enabled(&self) -> bool {
        self.core.prompt != "disabled"
    }

    /// Gets a preference value by key.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_cloud_cli::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.get("http_timeout"), Some("30".to_string()));
    /// assert_eq!(config.get("browser"), None);
    /// assert_eq!(config.get("unknown_key"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "browser" => self.core.browser.clone(),
            "oauth_callback_port" => Some(self.core.oauth_callback_port.to_string()),
            "http_timeout" => Some(self.core.http_timeout.to_string()),
            "prompt" => Some(self.core.prompt.clone()),
            _ => None,
        }
    }

    /// Sets a preference value by key, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "browser" => self.core.browser = Some(value.to_string()),
            "oauth_callback_port" => {
                self.core.oauth_callback_port = value
                    .parse()
                    .with_context(|| format!("Invalid port '{}'", value))?;
            }
            "http_timeout" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout '{}'", value))?;
                if secs == 0 {
                    bail!("http_timeout must be at least 1 second");
                }
                self.core.http_timeout = secs;
            }
            "prompt" => {
                if !["enabled", "disabled"].contains(&value) {
                    bail!("Invalid value for prompt. Valid values: enabled, disabled");
                }
                self.core.prompt = value.to_string();
            }
            _ => bail!(
                "Unknown configuration key '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Resets a preference to its default.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        let defaults = CoreConfig::default();
        match key {
            "browser" => self.core.browser = None,
            "oauth_callback_port" => self.core.oauth_callback_port = defaults.oauth_callback_port,
            "http_timeout" => self.core.http_timeout = defaults.http_timeout,
            "prompt" => self.core.prompt = defaults.prompt,
            _ => bail!(
                "Unknown configuration key '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}
