//! Library file and folder naming from user-configurable templates.
//!
//! Templates contain bracketed tokens (`{Movie Title} ({Release Year})`)
//! whose surrounding punctuation collapses away when a field is absent.
//! Layout: `token.rs` (token grammar and substitution), `cleanup.rs`
//! (separator collapsing and illegal character substitution),
//! `media_formatter.rs` (codec/channel/language display names),
//! `builder.rs` (the renderer itself), `preview.rs` (sample fixtures for
//! naming previews).

pub mod builder;
pub mod cleanup;
pub mod media_formatter;
pub mod preview;
pub mod token;

pub use builder::FileNameBuilder;
pub use preview::{preview_episode, preview_movie};
