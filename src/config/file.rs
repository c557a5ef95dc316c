//
//  bitbucket-cloud-cli
//  config/file.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration File I/O Module
//!
//! Low-level file operations shared by the host registry and the
//! preferences file.
//!
//! - Reads treat a missing file as "no content" rather than an error.
//! - Writes create the parent directory (mode 0755), write a sibling temp
//!   file with the requested mode and rename it over the target, so readers
//!   never observe a half-written file.
//! - [`FileLock`] holds an exclusive advisory lock across a
//!   read-modify-write cycle.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

/// Reads the contents of a configuration file.
///
/// # Returns
///
/// - `Ok(Some(String))` - The complete contents of the file
/// - `Ok(None)` - The file does not exist
/// - `Err` - The file exists but could not be read
pub fn read_config_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Writes content to a configuration file atomically.
///
/// The parent directory is created with mode 0755 when missing. The file is
/// written to a temporary sibling with the given `mode` (Unix only) and then
/// renamed into place.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use bitbucket_cloud_cli::config::write_config_file;
///
/// write_config_file(Path::new("/tmp/bb/hosts.yml"), "{}\n", 0o600)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn write_config_file(path: &Path, content: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_config_dir(parent)?;
    }

    let temp_path = temp_path_for(path);
    {
        let mut file = open_for_write(&temp_path, mode)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote config file");
    Ok(())
}

/// Creates the configuration directory (mode 0755) if it does not exist.
pub fn create_config_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn open_for_write(path: &Path, mode: u32) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// An exclusive advisory lock on a lock file.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Blocks until an exclusive lock on `path` is held.
    ///
    /// The lock file and its parent directory are created when missing.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            create_config_dir(parent)?;
        }
        let file = open_for_lock(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", path.display()))?;
        tracing::debug!(path = %path.display(), "acquired lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

fn open_for_lock(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}
