//! # Design
//!
//! - Provide structured, constant-message errors for disk transfers.
//! - Capture operation context (paths, sizes) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for disk transfer operations.
pub type DiskOpsResult<T> = Result<T, DiskOpsError>;

/// Errors produced by the transfer protocol.
#[derive(Debug, Error)]
pub enum DiskOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("diskops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("diskops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The transfer source does not exist.
    #[error("diskops source missing")]
    SourceMissing {
        /// Path that was expected to exist.
        path: PathBuf,
    },
    /// Source and destination resolve to the same path.
    #[error("diskops source and destination are the same file")]
    SameFile {
        /// The offending path.
        path: PathBuf,
    },
    /// The destination already exists and overwriting is disabled.
    #[error("diskops destination already exists")]
    DestinationExists {
        /// Existing destination path.
        path: PathBuf,
    },
    /// The transfer would place the destination inside the source tree.
    #[error("diskops destination is inside the source")]
    DestinationInsideSource {
        /// Transfer source.
        source_path: PathBuf,
        /// Offending destination.
        destination: PathBuf,
    },
    /// Post-transfer verification failed after exhausting retries.
    #[error("diskops transfer verification failed")]
    VerificationFailed {
        /// Destination that failed verification.
        path: PathBuf,
        /// Size expected at the destination.
        expected: u64,
        /// Size observed at the destination.
        actual: u64,
    },
    /// A failed transfer could not be rolled back; manual cleanup required.
    #[error("diskops rollback failed")]
    RollbackFailed {
        /// Path left behind by the failed rollback.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Every requested transfer method was attempted and none succeeded.
    #[error("diskops no transfer method succeeded")]
    MethodsExhausted {
        /// Transfer source.
        source_path: PathBuf,
        /// Transfer destination.
        destination: PathBuf,
    },
}

impl DiskOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn io_helper_preserves_the_source_error() {
        let err = DiskOpsError::io("copy", "path", io::Error::other("io"));
        assert!(matches!(err, DiskOpsError::Io { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn destination_exists_is_distinct_from_io() {
        let err = DiskOpsError::DestinationExists {
            path: "dest".into(),
        };
        assert!(err.source().is_none());
        assert!(!matches!(err, DiskOpsError::Io { .. }));
    }

    #[test]
    fn path_only_variants_carry_no_source_error() {
        let inside = DiskOpsError::DestinationInsideSource {
            source_path: "from".into(),
            destination: "from/to".into(),
        };
        assert!(inside.source().is_none());

        let exhausted = DiskOpsError::MethodsExhausted {
            source_path: "from".into(),
            destination: "to".into(),
        };
        assert!(exhausted.source().is_none());
    }
}
