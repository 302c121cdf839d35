//! The import pipeline: decide which candidate files belong in the library,
//! then move them there with verified transfers.
//!
//! `decision` defines the rule seam, `specifications` the built-in rules,
//! `engine` the batch evaluator, and `executor` the side-effecting half that
//! renders names, transfers files, persists records, and emits events.

pub mod decision;
pub mod engine;
pub mod executor;
pub mod specifications;

pub use decision::{ImportDecision, ImportSpecification, SpecDecision};
pub use engine::{ImportBatch, ImportDecisionEngine};
pub use executor::{ImportExecutor, ImportOutcome, ImportResult};
pub use specifications::{
    FullSeasonSpecification, MinimumSizeSpecification, NotSampleSpecification,
    UpgradeSpecification,
};
