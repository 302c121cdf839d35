//! Quality tiers, revisions, profiles, and the sample/trailer classifier.
//!
//! Layout: `model.rs` (tiers and the quality model), `definitions.rs`
//! (display titles and size bands), `profile.rs` (profile-relative
//! ordering), `sample.rs` (runtime/size heuristics for sample detection).

pub mod definitions;
pub mod model;
pub mod profile;
pub mod sample;

pub use definitions::{QualityCatalog, QualityDefinition};
pub use model::{Quality, QualityModel, QualitySource, QualitySourceClass, Revision};
pub use profile::{QualityComparer, QualityProfile};
pub use sample::{SampleCheck, is_sample, is_trailer};
