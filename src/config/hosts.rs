//
//  bitbucket-cloud-cli
//  config/hosts.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Host Registry Module
//!
//! The host registry records which accounts are signed in to which Bitbucket
//! host, which of them is active, and the preferred git transport. It is
//! persisted as YAML at `<configDir>/hosts.yml` with mode 0600:
//!
//! ```yaml
//! bitbucket.org:
//!   users:
//!     alice: {}
//!     bob:
//!       token_obtained_at: 2026-01-12T10:00:00Z
//!   user: alice
//!   git_protocol: ssh
//! ```
//!
//! Credentials themselves never appear here; they live in the keychain.
//!
//! ## Invariants
//!
//! - The active user of a host is always one of that host's users.
//! - Removing the last user of a host removes the host.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file::{read_config_file, write_config_file, FileLock};

/// File name of the host registry inside the configuration directory.
pub const HOSTS_FILE: &str = "hosts.yml";

const HOSTS_LOCK_FILE: &str = "hosts.yml.lock";

/// Git transport preferred for a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProtocol {
    #[default]
    Ssh,
    Https,
}

impl fmt::Display for GitProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => f.write_str("ssh"),
            Self::Https => f.write_str("https"),
        }
    }
}

impl FromStr for GitProtocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ssh" => Ok(Self::Ssh),
            "https" => Ok(Self::Https),
            other => anyhow::bail!("Invalid git protocol '{}'. Valid values: ssh, https", other),
        }
    }
}

/// Per-user metadata kept alongside the registry membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    /// When the stored OAuth token was obtained. Used to decide whether the
    /// token is about to expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_obtained_at: Option<DateTime<Utc>>,
}

/// Registry entry for one host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostEntry {
    /// Usernames signed in to this host.
    #[serde(default)]
    pub users: BTreeMap<String, UserEntry>,

    /// The active username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Preferred git transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_protocol: Option<GitProtocol>,
}

/// The in-memory host registry.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::config::HostRegistry;
///
/// let mut registry = HostRegistry::default();
/// registry.set_active_user("bitbucket.org", "alice");
/// registry.set_active_user("bitbucket.org", "bob");
/// assert_eq!(registry.active_user("bitbucket.org"), Some("bob"));
/// assert_eq!(registry.users("bitbucket.org"), vec!["alice", "bob"]);
///
/// registry.remove_user("bitbucket.org", "bob");
/// assert_eq!(registry.active_user("bitbucket.org"), Some("alice"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostRegistry {
    hosts: BTreeMap<String, HostEntry>,
}

impl HostRegistry {
    /// Parses a registry from YAML. Empty input yields an empty registry.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse hosts registry")
    }

    /// Serializes the registry to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize hosts registry")
    }

    /// Returns the entry for `host`, if any.
    pub fn host(&self, host: &str) -> Option<&HostEntry> {
        self.hosts.get(host)
    }

    /// Returns the active user of `host`.
    pub fn active_user(&self, host: &str) -> Option<&str> {
        self.hosts.get(host).and_then(|h| h.user.as_deref())
    }

    /// Makes `user` the active user of `host`, adding it to the host's users
    /// (and the host to the registry) when needed.
    pub fn set_active_user(&mut self, host: &str, user: &str) {
        let entry = self.hosts.entry(host.to_string()).or_default();
        entry.users.entry(user.to_string()).or_default();
        entry.user = Some(user.to_string());
    }

    /// Removes `user` from `host`.
    ///
    /// When the active user is removed, the first remaining user (in name
    /// order) becomes active. When no users remain, the host is removed.
    ///
    /// # Returns
    ///
    /// `true` if the user was a member of the host.
    pub fn remove_user(&mut self, host: &str, user: &str) -> bool {
        let Some(entry) = self.hosts.get_mut(host) else {
            return false;
        };
        let removed = entry.users.remove(user).is_some();

        if entry.user.as_deref() == Some(user) {
            entry.user = entry.users.keys().next().cloned();
        }
        if entry.users.is_empty() {
            self.hosts.remove(host);
        }
        removed
    }

    /// Returns the users of `host` in name order.
    pub fn users(&self, host: &str) -> Vec<&str> {
        self.hosts
            .get(host)
            .map(|h| h.users.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Checks whether `user` is signed in to `host`.
    pub fn has_user(&self, host: &str, user: &str) -> bool {
        self.hosts
            .get(host)
            .is_some_and(|h| h.users.contains_key(user))
    }

    /// Returns the git protocol for `host`, defaulting to SSH.
    pub fn git_protocol(&self, host: &str) -> GitProtocol {
        self.hosts
            .get(host)
            .and_then(|h| h.git_protocol)
            .unwrap_or_default()
    }

    /// Sets the git protocol of a known host.
    ///
    /// # Returns
    ///
    /// `false` if the host is not in the registry.
    pub fn set_git_protocol(&mut self, host: &str, protocol: GitProtocol) -> bool {
        match self.hosts.get_mut(host) {
            Some(entry) => {
                entry.git_protocol = Some(protocol);
                true
            }
            None => false,
        }
    }

    /// Hosts that have an active user, in name order.
    pub fn authenticated_hosts(&self) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|(_, h)| h.user.as_deref().is_some_and(|u| !u.is_empty()))
            .map(|(host, _)| host.as_str())
            .collect()
    }

    /// When the stored token of `user` on `host` was obtained.
    pub fn token_obtained_at(&self, host: &str, user: &str) -> Option<DateTime<Utc>> {
        self.hosts
            .get(host)
            .and_then(|h| h.users.get(user))
            .and_then(|u| u.token_obtained_at)
    }

    /// Records (or clears) when the stored token of a known user was obtained.
    pub fn set_token_obtained_at(
        &mut self,
        host: &str,
        user: &str,
        obtained_at: Option<DateTime<Utc>>,
    ) {
        if let Some(entry) = self.hosts.get_mut(host).and_then(|h| h.users.get_mut(user)) {
            entry.token_obtained_at = obtained_at;
        }
    }

    /// Checks whether the registry has no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// The on-disk location of the host registry.
#[derive(Debug, Clone)]
pub struct HostsFile {
    dir: PathBuf,
}

impl HostsFile {
    /// The registry stored in `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: config_dir.into(),
        }
    }

    /// Path of `hosts.yml`.
    pub fn path(&self) -> PathBuf {
        self.dir.join(HOSTS_FILE)
    }

    /// Loads the registry. A missing file yields an empty registry.
    pub fn load(&self) -> Result<HostRegistry> {
        let path = self.path();
        match read_config_file(&path)? {
            Some(content) => HostRegistry::from_yaml(&content)
                .with_context(|| format!("Invalid registry file {}", path.display())),
            None => Ok(HostRegistry::default()),
        }
    }

    /// Writes the registry with mode 0600.
    pub fn save(&self, registry: &HostRegistry) -> Result<()> {
        write_config_file(&self.path(), &registry.to_yaml()?, 0o600)
    }

    /// Loads, mutates and saves the registry while holding an exclusive
    /// lock, so concurrent invocations do not lose each other's updates.
    pub fn update<R>(&self, f: impl FnOnce(&mut HostRegistry) -> R) -> Result<R> {
        let _lock = FileLock::acquire(&self.dir.join(HOSTS_LOCK_FILE))?;
        let mut registry = self.load()?;
        let result = f(&mut registry);
        self.save(&registry)?;
        Ok(result)
    }

    /// The configuration directory holding the registry.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Normalizes a host URL to a bare lowercase hostname.
///
/// # Examples
///
/// ```rust
/// use bitbucket_cloud_cli::config::normalize_host;
///
/// assert_eq!(normalize_host("https://bitbucket.org"), "bitbucket.org");
/// assert_eq!(normalize_host("  HTTPS://BitBucket.Org/  "), "bitbucket.org");
/// ```
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host.strip_prefix("https://").unwrap_or(host);
    let host = host.strip_prefix("http://").unwrap_or(host);
    let host = host.strip_suffix('/').unwrap_or(host);
    host.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "bitbucket.org";

    #[test]
    fn test_set_active_user_keeps_previous_users() {
        let mut registry = HostRegistry::default();
        registry.set_active_user(HOST, "u1");
        registry.set_active_user(HOST, "u2");

        assert_eq!(registry.users(HOST), vec!["u1", "u2"]);
        assert_eq!(registry.active_user(HOST), Some("u2"));
    }

    #[test]
    fn test_remove_active_user_elects_successor() {
        let mut registry = HostRegistry::default();
        registry.set_active_user(HOST, "carol");
        registry.set_active_user(HOST, "alice");
        registry.set_active_user(HOST, "bob");

        assert!(registry.remove_user(HOST, "bob"));
        assert_eq!(registry.active_user(HOST), Some("alice"));
    }

    #[test]
    fn test_remove_inactive_user_keeps_active() {
        let mut registry = HostRegistry::default();
        registry.set_active_user(HOST, "alice");
        registry.set_active_user(HOST, "bob");

        registry.remove_user(HOST, "alice");
        assert_eq!(registry.active_user(HOST), Some("bob"));
    }

    #[test]
    fn test_remove_last_user_removes_host() {
        let mut registry = HostRegistry::default();
        registry.set_active_user(HOST, "alice");

        assert!(registry.remove_user(HOST, "alice"));
        assert!(registry.host(HOST).is_none());
        assert!(registry.authenticated_hosts().is_empty());
        assert!(!registry.remove_user(HOST, "alice"));
    }

    #[test]
    fn test_git_protocol_defaults_to_ssh() {
        let mut registry = HostRegistry::default();
        assert_eq!(registry.git_protocol(HOST), GitProtocol::Ssh);
        assert!(!registry.set_git_protocol(HOST, GitProtocol::Https));

        registry.set_active_user(HOST, "alice");
        assert!(registry.set_git_protocol(HOST, GitProtocol::Https));
        assert_eq!(registry.git_protocol(HOST), GitProtocol::Https);
    }

    #[test]
    fn test_yaml_layout() {
        let mut registry = HostRegistry::default();
        registry.set_active_user(HOST, "alice");

        let yaml = registry.to_yaml().unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value[HOST]["user"].as_str(), Some("alice"));
        assert!(value[HOST]["users"]["alice"].is_mapping());

        let parsed = HostRegistry::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, registry);
    }

    #[test]
    fn test_parse_hand_written_file() {
        let yaml = "bitbucket.org:\n  users:\n    alice: {}\n  user: alice\n  git_protocol: https\n";
        let registry = HostRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.active_user(HOST), Some("alice"));
        assert_eq!(registry.git_protocol(HOST), GitProtocol::Https);
    }

    #[test]
    fn test_invalid_yaml_fails() {
        assert!(HostRegistry::from_yaml("bitbucket.org: [unclosed").is_err());
    }

    #[test]
    fn test_hosts_file_round_trip_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let file = HostsFile::new(dir.path());

        assert!(file.load().unwrap().is_empty());

        file.update(|r| r.set_active_user(HOST, "alice")).unwrap();
        let loaded = file.load().unwrap();
        assert_eq!(loaded.active_user(HOST), Some("alice"));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://bitbucket.org"), "bitbucket.org");
        assert_eq!(normalize_host("http://bitbucket.org/"), "bitbucket.org");
        assert_eq!(normalize_host("BITBUCKET.ORG"), "bitbucket.org");
    }
}
