//! Transactional file and folder transfer protocol.
//!
//! Transfers run against a method preference list: each method is attempted
//! in order and the first that succeeds wins. Hard link failures fall
//! through to the next method; copy and move failures are terminal because
//! they may have touched the destination.
//!
//! Verification strength resolves per operation. Same-mount and union
//! filesystem transfers get a size check; every other cross-mount transfer
//! keeps the sidecar-based transactional path, which copies to a
//! `.partial~` file and promotes it only after the size verifies.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use walkdir::WalkDir;

use cellarr_config::{TransferPolicy, VerificationMode};

use crate::error::{DiskOpsError, DiskOpsResult};
use crate::provider::{DiskProvider, MountInfo};

const RETRY_COUNT: u32 = 2;
const PARTIAL_SUFFIX: &str = ".partial~";
const BACKUP_SUFFIX: &str = ".backup~";
/// Network filesystems may report stale sizes briefly after a write; give
/// the IO stack time to recover before any rollback or cleanup.
const IO_SETTLE_DELAY: Duration = Duration::from_secs(3);
/// CIFS needs longer after promoting a hard-linked sidecar.
const LINK_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// A single way of getting bytes from source to destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// Link the destination to the source inode; source stays valid.
    HardLink,
    /// Duplicate the bytes; source stays valid.
    Copy,
    /// Relocate the file; source is gone afterwards.
    Move,
}

impl TransferMethod {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HardLink => "hardlink",
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }
}

/// Preference list for imports that must leave the source seeding.
pub const HARDLINK_OR_COPY: &[TransferMethod] = &[TransferMethod::HardLink, TransferMethod::Copy];
/// Preference list for plain copies.
pub const COPY_ONLY: &[TransferMethod] = &[TransferMethod::Copy];
/// Preference list for imports that consume the source.
pub const MOVE_ONLY: &[TransferMethod] = &[TransferMethod::Move];

/// Transfer protocol over a [`DiskProvider`].
#[derive(Debug, Clone)]
pub struct TransferService<P: DiskProvider> {
    provider: P,
    policy: TransferPolicy,
    io_settle_delay: Duration,
    link_settle_delay: Duration,
}

impl<P: DiskProvider> TransferService<P> {
    /// Build a transfer service over the given provider and policy.
    #[must_use]
    pub fn new(provider: P, policy: TransferPolicy) -> Self {
        Self {
            provider,
            policy,
            io_settle_delay: IO_SETTLE_DELAY,
            link_settle_delay: LINK_SETTLE_DELAY,
        }
    }

    /// Access to the underlying provider, for callers that need primitives.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    #[cfg(test)]
    fn without_settle_delays(mut self) -> Self {
        self.io_settle_delay = Duration::ZERO;
        self.link_settle_delay = Duration::ZERO;
        self
    }

    /// Transfer one file, trying each method in preference order. Returns
    /// the method that succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error when the source is missing, the paths are the same
    /// (a case-only difference still errors unless `Move` was requested),
    /// the destination lies inside the source, the destination exists and
    /// overwriting is disabled, verification fails after retries, or no
    /// method in the list succeeds.
    pub fn transfer_file(
        &self,
        source: &Path,
        destination: &Path,
        methods: &[TransferMethod],
    ) -> DiskOpsResult<TransferMethod> {
        if !self.provider.file_exists(source) {
            return Err(DiskOpsError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        if source == destination {
            return Err(DiskOpsError::SameFile {
                path: source.to_path_buf(),
            });
        }
        if same_path_ignoring_case(source, destination) {
            // Only a move can express a case-only rename.
            if !methods.contains(&TransferMethod::Move) {
                return Err(DiskOpsError::SameFile {
                    path: source.to_path_buf(),
                });
            }
            self.rename_in_place(source, destination)?;
            return Ok(TransferMethod::Move);
        }
        if destination.starts_with(source) {
            return Err(DiskOpsError::DestinationInsideSource {
                source_path: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }

        if let Some(parent) = destination.parent()
            && !self.provider.folder_exists(parent)
        {
            self.provider.create_folder(parent)?;
        }
        self.clear_destination(destination)?;

        // A move within one directory is a rename, verified by size.
        if source.parent() == destination.parent() && methods.contains(&TransferMethod::Move) {
            self.move_size_checked(source, destination)?;
            return Ok(TransferMethod::Move);
        }

        let verification = self.resolve_verification(source, destination);
        debug!(
            source = %source.display(),
            destination = %destination.display(),
            verification = ?verification,
            "transferring file"
        );

        for method in methods {
            match method {
                TransferMethod::HardLink => match self.provider.hard_link(source, destination) {
                    Ok(()) => return Ok(TransferMethod::HardLink),
                    Err(error) => {
                        debug!(
                            source = %source.display(),
                            error = %error,
                            "hard link failed, trying next method"
                        );
                    }
                },
                TransferMethod::Copy => {
                    self.copy_with_verification(source, destination, verification)?;
                    return Ok(TransferMethod::Copy);
                }
                TransferMethod::Move => {
                    self.move_with_verification(source, destination, verification)?;
                    return Ok(TransferMethod::Move);
                }
            }
        }

        Err(DiskOpsError::MethodsExhausted {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
        })
    }

    /// Transfer a folder tree, subfolders before their sibling files. Junk
    /// files (`.nfs*`, `debug.log`, `*.socket`) are skipped. Returns the
    /// number of files transferred.
    ///
    /// # Errors
    ///
    /// Returns an error when the source is missing, the destination lies
    /// inside the source tree, or any file transfer fails.
    pub fn transfer_folder(
        &self,
        source: &Path,
        destination: &Path,
        methods: &[TransferMethod],
    ) -> DiskOpsResult<u64> {
        if !self.provider.folder_exists(source) {
            return Err(DiskOpsError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        if destination.starts_with(source) {
            return Err(DiskOpsError::DestinationInsideSource {
                source_path: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }
        self.provider.create_folder(destination)?;

        let mut transferred = 0u64;
        let mut all_moved = true;
        for entry in WalkDir::new(source).sort_by(dirs_first) {
            let entry =
                entry.map_err(|error| DiskOpsError::walkdir("transfer_folder", source, error))?;
            let relative = entry.path().strip_prefix(source).map_err(|_| {
                DiskOpsError::SourceMissing {
                    path: entry.path().to_path_buf(),
                }
            })?;
            let target = destination.join(relative);
            if entry.file_type().is_dir() {
                self.provider.create_folder(&target)?;
                continue;
            }
            if should_ignore(entry.path()) {
                debug!(path = %entry.path().display(), "skipping junk file");
                continue;
            }
            let method = self.transfer_file(entry.path(), &target, methods)?;
            all_moved &= method == TransferMethod::Move;
            transferred += 1;
        }

        if all_moved && methods.contains(&TransferMethod::Move) {
            self.provider.delete_folder(source)?;
        }
        Ok(transferred)
    }

    /// Make the destination folder an exact copy of the source: copy files
    /// that are missing or differ, delete entries the source does not have.
    /// Returns the number of files copied.
    ///
    /// # Errors
    ///
    /// Returns an error when either tree cannot be traversed or a copy fails.
    pub fn mirror_folder(&self, source: &Path, destination: &Path) -> DiskOpsResult<u64> {
        if !self.provider.folder_exists(source) {
            return Err(DiskOpsError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        self.provider.create_folder(destination)?;

        let mut copied = 0u64;
        for entry in WalkDir::new(source).sort_by(dirs_first) {
            let entry =
                entry.map_err(|error| DiskOpsError::walkdir("mirror_folder", source, error))?;
            let relative = entry.path().strip_prefix(source).map_err(|_| {
                DiskOpsError::SourceMissing {
                    path: entry.path().to_path_buf(),
                }
            })?;
            let target = destination.join(relative);
            if entry.file_type().is_dir() {
                self.provider.create_folder(&target)?;
                continue;
            }
            if should_ignore(entry.path()) {
                continue;
            }
            if self.provider.file_exists(&target) && self.files_match(entry.path(), &target) {
                continue;
            }
            if self.provider.file_exists(&target) {
                self.provider.delete_file(&target)?;
            }
            self.transfer_file(entry.path(), &target, COPY_ONLY)?;
            copied += 1;
        }

        self.delete_orphans(source, destination)?;
        Ok(copied)
    }

    fn delete_orphans(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        let mut orphan_dirs: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(destination) {
            let entry =
                entry.map_err(|error| DiskOpsError::walkdir("delete_orphans", destination, error))?;
            if entry.path() == destination {
                continue;
            }
            if should_ignore(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(destination).map_err(|_| {
                DiskOpsError::SourceMissing {
                    path: entry.path().to_path_buf(),
                }
            })?;
            let origin = source.join(relative);
            let origin_present = if entry.file_type().is_dir() {
                self.provider.folder_exists(&origin)
            } else {
                self.provider.file_exists(&origin)
            };
            if origin_present {
                continue;
            }
            if entry.file_type().is_dir() {
                orphan_dirs.push(entry.path().to_path_buf());
            } else {
                self.provider.delete_file(entry.path())?;
            }
        }
        // Deepest first so parents empty out before removal.
        orphan_dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
        for dir in orphan_dirs {
            if self.provider.folder_exists(&dir) {
                self.provider.delete_folder(&dir)?;
            }
        }
        Ok(())
    }

    /// Case-only rename on a case-insensitive filesystem, routed through a
    /// sidecar so a crash mid-rename never loses the file.
    fn rename_in_place(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        let backup = sidecar(source, BACKUP_SUFFIX);
        if self.provider.file_exists(&backup) {
            self.provider.delete_file(&backup)?;
        }
        self.provider.move_file(source, &backup)?;
        if let Err(error) = self.provider.move_file(&backup, destination) {
            warn!(
                source = %source.display(),
                error = %error,
                "rename failed, restoring from backup"
            );
            self.settle(self.io_settle_delay);
            self.provider
                .move_file(&backup, source)
                .map_err(|restore| DiskOpsError::RollbackFailed {
                    path: backup.clone(),
                    source: std::io::Error::other(restore.to_string()),
                })?;
            return Err(error);
        }
        Ok(())
    }

    fn clear_destination(&self, destination: &Path) -> DiskOpsResult<()> {
        if !self.provider.file_exists(destination) {
            return Ok(());
        }
        if !self.policy.overwrite {
            return Err(DiskOpsError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }
        self.provider.delete_file(destination)
    }

    /// Resolve `TryTransactional` to a concrete mode from the mounts
    /// involved. Same-mount and union filesystem transfers step down to a
    /// size check; CIFS forces the full transactional path; any other
    /// cross-mount transfer stays transactional.
    fn resolve_verification(&self, source: &Path, destination: &Path) -> VerificationMode {
        let mode = self.policy.default_verification;
        if mode != VerificationMode::TryTransactional {
            return mode;
        }

        let source_mount = self.provider.mount(source);
        let destination_mount = self.provider.mount(destination);

        let same_mount = matches!(
            (&source_mount, &destination_mount),
            (Some(from), Some(to)) if from.mount_dir == to.mount_dir
        );
        let filesystem = |mount: &Option<MountInfo>| {
            mount
                .as_ref()
                .map(|info| info.filesystem.to_lowercase())
                .unwrap_or_default()
        };
        let source_fs = filesystem(&source_mount);
        let destination_fs = filesystem(&destination_mount);

        if same_mount {
            return VerificationMode::VerifyOnly;
        }
        if [&source_fs, &destination_fs]
            .iter()
            .any(|fs| fs.contains("mergerfs") || fs.contains("rclone"))
        {
            return VerificationMode::VerifyOnly;
        }
        if source_fs == "cifs" || destination_fs == "cifs" {
            return VerificationMode::Transactional;
        }
        mode
    }

    fn copy_with_verification(
        &self,
        source: &Path,
        destination: &Path,
        verification: VerificationMode,
    ) -> DiskOpsResult<()> {
        match verification {
            VerificationMode::None => self.provider.copy_file(source, destination),
            VerificationMode::VerifyOnly => self.copy_size_checked(source, destination),
            VerificationMode::Transactional | VerificationMode::TryTransactional => {
                self.copy_transactional(source, destination)
            }
        }
    }

    fn move_with_verification(
        &self,
        source: &Path,
        destination: &Path,
        verification: VerificationMode,
    ) -> DiskOpsResult<()> {
        match verification {
            VerificationMode::None => self.provider.move_file(source, destination),
            VerificationMode::VerifyOnly => self.move_size_checked(source, destination),
            VerificationMode::Transactional | VerificationMode::TryTransactional => {
                self.move_transactional(source, destination, verification)
            }
        }
    }

    /// Copy and confirm the destination size, deleting the destination and
    /// retrying on mismatch.
    fn copy_size_checked(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        let expected = self.provider.file_size(source)?;
        let mut last_actual = 0;
        for attempt in 0..=RETRY_COUNT {
            if let Err(error) = self.provider.copy_file(source, destination) {
                self.discard(destination);
                return Err(error);
            }
            let actual = self.provider.file_size(destination).unwrap_or(0);
            if actual == expected {
                return Ok(());
            }
            last_actual = actual;
            warn!(
                destination = %destination.display(),
                expected,
                actual,
                attempt,
                "copy verification mismatch, retrying"
            );
            self.discard(destination);
        }
        Err(DiskOpsError::VerificationFailed {
            path: destination.to_path_buf(),
            expected,
            actual: last_actual,
        })
    }

    /// Copy through a `.partial~` sidecar, promoting it only once the size
    /// verifies. An interrupted copy leaves no destination behind.
    fn copy_transactional(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        let expected = self.provider.file_size(source)?;
        let partial = sidecar(destination, PARTIAL_SUFFIX);
        if self.provider.file_exists(&partial) {
            self.provider.delete_file(&partial)?;
        }
        let mut last_actual = 0;
        for attempt in 0..=RETRY_COUNT {
            if let Err(error) = self.provider.copy_file(source, &partial) {
                self.discard(&partial);
                return Err(error);
            }
            let actual = self.provider.file_size(&partial).unwrap_or(0);
            if actual == expected {
                self.provider.move_file(&partial, destination)?;
                return Ok(());
            }
            last_actual = actual;
            warn!(
                destination = %destination.display(),
                expected,
                actual,
                attempt,
                "transactional copy mismatch, retrying"
            );
            self.discard(&partial);
        }
        Err(DiskOpsError::VerificationFailed {
            path: destination.to_path_buf(),
            expected,
            actual: last_actual,
        })
    }

    /// Rename and confirm the destination size, rolling the rename back on
    /// mismatch when the source survived.
    fn move_size_checked(&self, source: &Path, destination: &Path) -> DiskOpsResult<()> {
        let expected = self.provider.file_size(source)?;
        if let Err(error) = self.provider.move_file(source, destination) {
            self.rollback_partial_move(source, destination);
            return Err(error);
        }
        let actual = self.provider.file_size(destination).unwrap_or(0);
        if actual != expected {
            self.rollback_partial_move(source, destination);
            return Err(DiskOpsError::VerificationFailed {
                path: destination.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn rollback_partial_move(&self, source: &Path, destination: &Path) {
        self.settle(self.io_settle_delay);
        if self.provider.file_exists(source) {
            self.remove_quietly(destination);
        } else {
            warn!(
                source = %source.display(),
                destination = %destination.display(),
                "source lost during a failed move, incomplete file may remain"
            );
        }
    }

    /// Cross-mount move: hard link the source to a `.backup~` sidecar, move
    /// the link through the destination's `.partial~`, promote, then release
    /// the source. The backup sidecar is removed on every branch. A hard
    /// link failure degrades to a transactional copy under `Transactional`,
    /// or a verified move otherwise.
    fn move_transactional(
        &self,
        source: &Path,
        destination: &Path,
        verification: VerificationMode,
    ) -> DiskOpsResult<()> {
        let expected = self.provider.file_size(source)?;
        let backup = sidecar(source, BACKUP_SUFFIX);
        let partial = sidecar(destination, PARTIAL_SUFFIX);
        if self.provider.file_exists(&backup) {
            self.provider.delete_file(&backup)?;
        }
        if self.provider.file_exists(&partial) {
            self.provider.delete_file(&partial)?;
        }

        match self.provider.hard_link(source, &backup) {
            Ok(()) => {
                let promoted = self.promote_backup(&backup, &partial, destination, expected);
                self.remove_quietly(&backup);
                match promoted {
                    Ok(true) => return self.provider.delete_file(source),
                    Ok(false) => {}
                    Err(error) => {
                        self.remove_quietly(&partial);
                        return Err(error);
                    }
                }
            }
            Err(error) => {
                debug!(
                    source = %source.display(),
                    error = %error,
                    "hard link for transactional move failed, falling back"
                );
            }
        }

        if verification == VerificationMode::Transactional {
            self.copy_transactional(source, destination)?;
            self.provider.delete_file(source)
        } else {
            self.move_size_checked(source, destination)
        }
    }

    /// Move the hard-linked backup into the partial sidecar and promote it.
    /// `Ok(false)` means the sizes never matched and the caller should fall
    /// back.
    fn promote_backup(
        &self,
        backup: &Path,
        partial: &Path,
        destination: &Path,
        expected: u64,
    ) -> DiskOpsResult<bool> {
        self.provider.move_file(backup, partial)?;
        let actual = self.provider.file_size(partial).unwrap_or(0);
        if actual == expected {
            self.provider.move_file(partial, destination)?;
            return Ok(true);
        }
        warn!(
            destination = %destination.display(),
            expected,
            actual,
            "hard-linked move did not verify"
        );
        self.settle(self.link_settle_delay);
        self.remove_quietly(partial);
        Ok(false)
    }

    /// Settle the IO stack, then best-effort removal of a half-written file.
    fn discard(&self, path: &Path) {
        self.settle(self.io_settle_delay);
        self.remove_quietly(path);
    }

    fn remove_quietly(&self, path: &Path) {
        if self.provider.file_exists(path)
            && let Err(error) = self.provider.delete_file(path)
        {
            warn!(
                path = %path.display(),
                error = %error,
                "failed to remove incomplete transfer artifact"
            );
        }
    }

    fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    fn files_match(&self, left: &Path, right: &Path) -> bool {
        let sizes = (self.provider.file_size(left), self.provider.file_size(right));
        match sizes {
            (Ok(a), Ok(b)) if a == b => files_equal(left, right).unwrap_or(false),
            _ => false,
        }
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    path.with_file_name(name)
}

fn same_path_ignoring_case(left: &Path, right: &Path) -> bool {
    left.to_string_lossy().to_lowercase() == right.to_string_lossy().to_lowercase()
}

/// Subfolders ahead of their sibling files within each directory.
fn dirs_first(left: &walkdir::DirEntry, right: &walkdir::DirEntry) -> std::cmp::Ordering {
    right
        .file_type()
        .is_dir()
        .cmp(&left.file_type().is_dir())
        .then_with(|| left.file_name().cmp(right.file_name()))
}

/// Junk that download clients and network filesystems leave behind.
fn should_ignore(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|name| name.to_string_lossy()) else {
        return false;
    };
    name.starts_with(".nfs") || name.eq_ignore_ascii_case("debug.log") || name.ends_with(".socket")
}

/// Buffered byte comparison of two files of equal size.
fn files_equal(left: &Path, right: &Path) -> std::io::Result<bool> {
    const CHUNK: usize = 64 * 1024;
    let mut left_file = std::fs::File::open(left)?;
    let mut right_file = std::fs::File::open(right)?;
    let mut left_buffer = vec![0u8; CHUNK];
    let mut right_buffer = vec![0u8; CHUNK];
    loop {
        let read_left = left_file.read(&mut left_buffer)?;
        let read_right = right_file.read(&mut right_buffer)?;
        if read_left != read_right || left_buffer[..read_left] != right_buffer[..read_right] {
            return Ok(false);
        }
        if read_left == 0 {
            return Ok(true);
        }
    }
}
