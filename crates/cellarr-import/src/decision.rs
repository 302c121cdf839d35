//! Decisions, rejections, and the acceptance rule seam.

use anyhow::Result;

use cellarr_core::{CandidateFile, LibraryItem};

/// Outcome of evaluating one rule against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecDecision {
    /// The rule has no objection.
    Accept,
    /// The rule rejects the candidate for the given human-readable reason.
    Reject(String),
    /// The rule does not apply to this kind of item; skipped, not rejected.
    NotApplicable,
}

/// One independent acceptance rule.
///
/// Rules return their verdict as a value; an `Err` from `evaluate` is an
/// unexpected rule failure, which the engine isolates to this rule and file.
pub trait ImportSpecification: Send + Sync {
    /// Stable rule identity used in logs and error rejections.
    fn name(&self) -> &'static str;

    /// Evaluate the candidate in the context of its parent item.
    ///
    /// # Errors
    ///
    /// Returns an error only for unexpected failures inside the rule.
    fn evaluate(&self, candidate: &CandidateFile, item: &LibraryItem) -> Result<SpecDecision>;
}

/// One candidate plus the reasons it was turned away, if any.
#[derive(Debug, Clone)]
pub struct ImportDecision {
    pub candidate: CandidateFile,
    pub rejections: Vec<String>,
}

impl ImportDecision {
    /// A decision with no objections.
    #[must_use]
    pub fn approved(candidate: CandidateFile) -> Self {
        Self {
            candidate,
            rejections: Vec::new(),
        }
    }

    /// A decision rejected for a single reason.
    #[must_use]
    pub fn rejected(candidate: CandidateFile, reason: impl Into<String>) -> Self {
        Self {
            candidate,
            rejections: vec![reason.into()],
        }
    }

    /// Approved exactly when no rejection reasons were recorded.
    #[must_use]
    pub fn approved_for_import(&self) -> bool {
        self.rejections.is_empty()
    }
}
