//! Profile-relative ordering between quality models.
//!
//! Ordering is never global: a profile lists the tiers it accepts from worst
//! to best, and two models are compared by their position in that list.
//! Tiers missing from the profile fall back to the canonical weight so the
//! comparison stays total.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{Quality, QualityModel};

/// An ordered list of acceptable tiers, worst first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,
    /// Accepted tiers from worst to best.
    pub items: Vec<Quality>,
    /// Tier at which upgrading stops.
    pub cutoff: Quality,
}

impl QualityProfile {
    /// A permissive profile accepting every tier in canonical order.
    #[must_use]
    pub fn any() -> Self {
        Self {
            name: "Any".to_string(),
            items: Quality::ALL.to_vec(),
            cutoff: Quality::Remux2160p,
        }
    }
}

/// Compares two quality models relative to one profile.
#[derive(Debug, Clone)]
pub struct QualityComparer<'a> {
    profile: &'a QualityProfile,
}

impl<'a> QualityComparer<'a> {
    #[must_use]
    pub fn new(profile: &'a QualityProfile) -> Self {
        Self { profile }
    }

    fn weight(&self, quality: Quality) -> usize {
        self.profile
            .items
            .iter()
            .position(|item| *item == quality)
            // Offset keeps profile-listed tiers strictly above unlisted ones.
            .map_or_else(|| quality.canonical_weight(), |index| index + Quality::ALL.len())
    }

    /// Compare two models: tier position first, then revision.
    #[must_use]
    pub fn compare(&self, left: &QualityModel, right: &QualityModel) -> Ordering {
        self.weight(left.quality)
            .cmp(&self.weight(right.quality))
            .then_with(|| left.revision.cmp(&right.revision))
    }

    /// Whether `candidate` is a strict upgrade over `current`.
    #[must_use]
    pub fn is_upgrade(&self, candidate: &QualityModel, current: &QualityModel) -> bool {
        self.compare(candidate, current) == Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QualitySource, Revision};

    fn model(quality: Quality) -> QualityModel {
        QualityModel::new(quality)
    }

    #[test]
    fn profile_position_beats_canonical_order() {
        // A profile that deliberately prefers WEBDL over Bluray.
        let profile = QualityProfile {
            name: "Web first".to_string(),
            items: vec![Quality::Hdtv1080p, Quality::Bluray1080p, Quality::WebDl1080p],
            cutoff: Quality::WebDl1080p,
        };
        let comparer = QualityComparer::new(&profile);

        assert_eq!(
            comparer.compare(&model(Quality::WebDl1080p), &model(Quality::Bluray1080p)),
            Ordering::Greater
        );
    }

    #[test]
    fn revision_breaks_ties_within_a_tier() {
        let profile = QualityProfile::any();
        let comparer = QualityComparer::new(&profile);

        let proper = QualityModel {
            quality: Quality::Bluray720p,
            revision: Revision { version: 2, real: 0 },
            source: QualitySource::Name,
        };

        assert!(comparer.is_upgrade(&proper, &model(Quality::Bluray720p)));
    }

    #[test]
    fn unlisted_tiers_rank_below_listed_ones() {
        let profile = QualityProfile {
            name: "HD only".to_string(),
            items: vec![Quality::Hdtv720p, Quality::Bluray720p],
            cutoff: Quality::Bluray720p,
        };
        let comparer = QualityComparer::new(&profile);

        assert!(comparer.is_upgrade(&model(Quality::Hdtv720p), &model(Quality::Remux2160p)));
    }
}
