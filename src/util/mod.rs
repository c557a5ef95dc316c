//
//  bitbucket-cloud-cli
//  util/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Utility Module
//!
//! Small helpers shared by the commands.
//!
//! ## Categories
//!
//! - **Browser**: [`browser_command`], [`open_browser`]
//! - **Terminal**: [`spinner`]
//! - **Time**: [`format_duration`]

use std::process::Command;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Environment, BB_BROWSER};

/// Picks the browser command to run, if one is configured.
///
/// The `browser` preference wins, then `BB_BROWSER`, then `BROWSER`.
/// `None` means the system default browser should be used.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::config::Environment;
/// use bitbucket_cloud_cli::util::browser_command;
///
/// let env = Environment::fixed([("BROWSER", "firefox")]);
/// assert_eq!(browser_command(None, &env).as_deref(), Some("firefox"));
/// assert_eq!(browser_command(Some("lynx"), &env).as_deref(), Some("lynx"));
/// ```
pub fn browser_command(configured: Option<&str>, env: &Environment) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| env.var(BB_BROWSER))
        .or_else(|| env.var("BROWSER"))
}

/// Opens `url` in a browser.
///
/// A configured command is split on whitespace and run with the URL as its
/// last argument; otherwise the system default browser is launched. The
/// browser process is not waited for.
pub fn open_browser(url: &str, configured: Option<&str>, env: &Environment) -> Result<()> {
    let Some(command) = browser_command(configured, env) else {
        return webbrowser::open(url).context("Failed to open the default browser");
    };

    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("Browser command is empty");
    };
    Command::new(program)
        .args(parts)
        .arg(url)
        .spawn()
        .with_context(|| format!("Failed to run browser command '{}'", command))?;
    Ok(())
}

/// A spinner on stderr that ticks until it is finished.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Formats a duration for display.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bitbucket_cloud_cli::util::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
/// assert_eq!(format_duration(Duration::from_secs(7200)), "2h 0m");
/// assert_eq!(format_duration(Duration::from_secs(90000)), "1d 1h");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_command_precedence() {
        let env = Environment::fixed([("BB_BROWSER", "chromium"), ("BROWSER", "firefox")]);
        assert_eq!(browser_command(None, &env).as_deref(), Some("chromium"));
        assert_eq!(browser_command(Some("  "), &env).as_deref(), Some("chromium"));
        assert_eq!(browser_command(Some("w3m"), &env).as_deref(), Some("w3m"));
    }

    #[test]
    fn test_no_browser_command_uses_default() {
        let env = Environment::Fixed(Default::default());
        assert_eq!(browser_command(None, &env), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m");
    }
}
