#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Transactional disk transfers for the import pipeline.

pub mod error;
pub mod provider;
pub mod transfer;

pub use error::{DiskOpsError, DiskOpsResult};
pub use provider::{DiskProvider, LocalDiskProvider, MountInfo};
pub use transfer::{
    COPY_ONLY, HARDLINK_OR_COPY, MOVE_ONLY, TransferMethod, TransferService,
};
