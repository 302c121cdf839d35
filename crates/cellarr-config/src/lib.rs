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

//! Typed configuration records consumed by the import pipeline.
//!
//! Layout: `model.rs` (naming, import and transfer policy records),
//! `error.rs` (parse failures for string-coded enums). Loading these records
//! from storage is the host application's concern; this crate only defines
//! the shapes and their defaults.

pub mod error;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ColonReplacement, DeepCheckSource, ImportPolicy, NamingConfig, TransferPolicy,
    VerificationMode,
};
