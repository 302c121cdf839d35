//! Filesystem access seam for the transfer protocol.
//!
//! The service talks to disk through [`DiskProvider`] so tests can observe
//! and fault individual primitives. [`LocalDiskProvider`] is the production
//! implementation over `std::fs` plus the mount table.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DiskOpsError, DiskOpsResult};

/// One entry of the mount table relevant to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Directory the filesystem is mounted on.
    pub mount_dir: PathBuf,
    /// Filesystem type as reported by the kernel, e.g. `ext4` or `cifs`.
    pub filesystem: String,
}

/// Primitive disk operations consumed by the transfer service.
pub trait DiskProvider: Send + Sync {
    /// Whether a regular file exists at the path.
    fn file_exists(&self, path: &Path) -> bool;

    /// Whether a directory exists at the path.
    fn folder_exists(&self, path: &Path) -> bool;

    /// Size of a regular file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be inspected.
    fn file_size(&self, path: &Path) -> DiskOpsResult<u64>;

    /// Create a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    fn create_folder(&self, path: &Path) -> DiskOpsResult<()>;

    /// Copy a file, replacing any existing destination.
    ///
    /// # Errors
    ///
    /// Returns an error when the copy fails.
    fn copy_file(&self, source: &Path, destination: &Path) -> DiskOpsResult<()>;

    /// Rename a file, replacing any existing destination.
    ///
    /// # Errors
    ///
    /// Returns an error when the rename fails.
    fn move_file(&self, source: &Path, destination: &Path) -> DiskOpsResult<()>;

    /// Create an additional hard link to a file.
    ///
    /// # Errors
    ///
    /// Returns an error when the link cannot be created, including when the
    /// filesystem does not support hard links.
    fn hard_link(&self, source: &Path, destination: &Path) -> DiskOpsResult<()>;

    /// Delete a regular file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be removed.
    fn delete_file(&self, path: &Path) -> DiskOpsResult<()>;

    /// Delete a directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the tree cannot be removed.
    fn delete_folder(&self, path: &Path) -> DiskOpsResult<()>;

    /// Mount table entry governing the path, when one can be determined.
    fn mount(&self, path: &Path) -> Option<MountInfo>;
}

/// Production provider backed by `std::fs` and `/proc/mounts`.
#[derive(Debug, Clone, Default)]
pub struct LocalDiskProvider;

impl LocalDiskProvider {
    /// Build the production provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DiskProvider for LocalDiskProvider {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn folder_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_size(&self, path: &Path) -> DiskOpsResult<u64> {
        fs::metadata(path)
            .map(|metadata| metadata.len())
            .map_err(|source| DiskOpsError::io("file_size", path, source))
    }

    fn create_folder(&self, path: &Path) -> DiskOpsResult<()> {
        fs::create_dir_all(path).map_err(|source| DiskOpsError::io("create_folder", path, source))
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        fs::copy(source, destination)
            .map(|_| ())
            .map_err(|source_err| DiskOpsError::io("copy_file", destination, source_err))
    }

    fn move_file(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            // Renames cannot cross mount points; degrade to copy and unlink.
            Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(source, destination)
                    .map_err(|source_err| DiskOpsError::io("move_file", destination, source_err))?;
                fs::remove_file(source)
                    .map_err(|source_err| DiskOpsError::io("move_file", source, source_err))
            }
            Err(source_err) => Err(DiskOpsError::io("move_file", destination, source_err)),
        }
    }

    fn hard_link(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        fs::hard_link(source, destination)
            .map_err(|source_err| DiskOpsError::io("hard_link", destination, source_err))
    }

    fn delete_file(&self, path: &Path) -> DiskOpsResult<()> {
        fs::remove_file(path).map_err(|source| DiskOpsError::io("delete_file", path, source))
    }

    fn delete_folder(&self, path: &Path) -> DiskOpsResult<()> {
        fs::remove_dir_all(path).map_err(|source| DiskOpsError::io("delete_folder", path, source))
    }

    fn mount(&self, path: &Path) -> Option<MountInfo> {
        let resolved = path
            .canonicalize()
            .or_else(|_| {
                path.parent()
                    .map(Path::canonicalize)
                    .unwrap_or_else(|| Ok(path.to_path_buf()))
            })
            .unwrap_or_else(|_| path.to_path_buf());
        longest_mount_for(&resolved, &read_mount_table())
    }
}

/// Pick the mount whose directory is the longest prefix of the path.
fn longest_mount_for(path: &Path, mounts: &[MountInfo]) -> Option<MountInfo> {
    mounts
        .iter()
        .filter(|mount| path.starts_with(&mount.mount_dir))
        .max_by_key(|mount| mount.mount_dir.as_os_str().len())
        .cloned()
}

#[cfg(target_os = "linux")]
fn read_mount_table() -> Vec<MountInfo> {
    match fs::read_to_string("/proc/mounts") {
        Ok(raw) => parse_mount_table(&raw),
        Err(error) => {
            debug!(error = %error, "unable to read mount table");
            Vec::new()
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn read_mount_table() -> Vec<MountInfo> {
    Vec::new()
}

/// Parse `/proc/mounts` lines: `device mount_dir fstype options dump pass`.
/// Mount directories escape whitespace as octal (`\040`).
fn parse_mount_table(raw: &str) -> Vec<MountInfo> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_dir = unescape_mount_dir(fields.next()?);
            let filesystem = fields.next()?.to_string();
            Some(MountInfo {
                mount_dir: PathBuf::from(mount_dir),
                filesystem,
            })
        })
        .collect()
}

fn unescape_mount_dir(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let digits: String = chars.clone().take(3).collect();
        if digits.len() == 3
            && let Ok(code) = u8::from_str_radix(&digits, 8)
        {
            out.push(char::from(code));
            chars.nth(2);
        } else {
            out.push(ch);
        }
    }
    out
}
