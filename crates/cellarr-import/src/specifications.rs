//! Built-in acceptance rules.

use std::cmp::Ordering;

use anyhow::Result;
use tracing::debug;

use cellarr_core::{CandidateFile, LibraryItem, MediaKind};
use cellarr_quality::{QualityComparer, QualityModel, SampleCheck, is_sample, is_trailer};

use crate::decision::{ImportSpecification, SpecDecision};

/// Rejects samples and promotional trailers.
#[derive(Debug, Default)]
pub struct NotSampleSpecification;

impl ImportSpecification for NotSampleSpecification {
    fn name(&self) -> &'static str {
        "not_sample"
    }

    fn evaluate(&self, candidate: &CandidateFile, item: &LibraryItem) -> Result<SpecDecision> {
        let check = SampleCheck {
            path: &candidate.path,
            size: candidate.size,
            quality: &candidate.quality,
            runtime: candidate.runtime,
            nominal_runtime: item.nominal_runtime(),
            is_special: candidate.is_special,
        };
        if is_sample(&check) {
            return Ok(SpecDecision::Reject("Sample".to_string()));
        }
        if is_trailer(&check) {
            return Ok(SpecDecision::Reject("Trailer".to_string()));
        }
        Ok(SpecDecision::Accept)
    }
}

/// Rejects files below the configured minimum size.
#[derive(Debug)]
pub struct MinimumSizeSpecification {
    minimum: u64,
}

impl MinimumSizeSpecification {
    #[must_use]
    pub fn new(minimum: u64) -> Self {
        Self { minimum }
    }
}

impl ImportSpecification for MinimumSizeSpecification {
    fn name(&self) -> &'static str {
        "minimum_size"
    }

    fn evaluate(&self, candidate: &CandidateFile, _item: &LibraryItem) -> Result<SpecDecision> {
        if self.minimum == 0 || candidate.size >= self.minimum {
            return Ok(SpecDecision::Accept);
        }
        debug!(
            path = %candidate.path.display(),
            size = candidate.size,
            minimum = self.minimum,
            "file is below the minimum size"
        );
        Ok(SpecDecision::Reject(format!(
            "{} bytes is smaller than the minimum allowed {} bytes",
            candidate.size, self.minimum
        )))
    }
}

/// Rejects episode files that parsed as a whole-season pack. Movies are out
/// of this rule's jurisdiction.
#[derive(Debug, Default)]
pub struct FullSeasonSpecification;

impl ImportSpecification for FullSeasonSpecification {
    fn name(&self) -> &'static str {
        "full_season"
    }

    fn evaluate(&self, candidate: &CandidateFile, _item: &LibraryItem) -> Result<SpecDecision> {
        if candidate.kind != MediaKind::Episode {
            return Ok(SpecDecision::NotApplicable);
        }
        let is_season_pack = candidate
            .episode
            .as_ref()
            .is_some_and(|episode| episode.episodes.is_empty());
        if is_season_pack {
            return Ok(SpecDecision::Reject(
                "Expected an episode but the file parsed as a full season pack".to_string(),
            ));
        }
        Ok(SpecDecision::Accept)
    }
}

/// Rejects candidates ranked strictly below the file the item already has.
///
/// The current file's quality comes from the host; items with no file yet
/// accept anything.
#[derive(Debug, Default)]
pub struct UpgradeSpecification {
    current: Option<QualityModel>,
}

impl UpgradeSpecification {
    #[must_use]
    pub fn new(current: Option<QualityModel>) -> Self {
        Self { current }
    }
}

impl ImportSpecification for UpgradeSpecification {
    fn name(&self) -> &'static str {
        "upgrade"
    }

    fn evaluate(&self, candidate: &CandidateFile, item: &LibraryItem) -> Result<SpecDecision> {
        let Some(current) = &self.current else {
            return Ok(SpecDecision::Accept);
        };
        let comparer = QualityComparer::new(&item.profile);
        if comparer.compare(&candidate.quality, current) == Ordering::Less {
            debug!(
                path = %candidate.path.display(),
                candidate_quality = %candidate.quality,
                current_quality = %current,
                "existing file outranks the candidate"
            );
            return Ok(SpecDecision::Reject(format!(
                "Not an upgrade over the existing {current}"
            )));
        }
        Ok(SpecDecision::Accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use uuid::Uuid;

    use cellarr_core::EpisodeInfo;
    use cellarr_quality::{Quality, QualityModel, QualityProfile};

    fn item() -> LibraryItem {
        LibraryItem {
            id: Uuid::new_v4(),
            kind: MediaKind::Movie,
            title: "Some Movie".to_string(),
            year: 2019,
            runtime_minutes: 110,
            path: PathBuf::from("/library/Some Movie (2019)"),
            profile: QualityProfile::any(),
        }
    }

    fn candidate(runtime_secs: u64, size: u64) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from("/staging/Some.Movie.2019.1080p.mkv"),
            kind: MediaKind::Movie,
            size,
            runtime: Some(Duration::from_secs(runtime_secs)),
            quality: QualityModel::new(Quality::Bluray1080p),
            release_group: None,
            edition: None,
            scene_name: None,
            languages: Vec::new(),
            is_special: false,
            episode: None,
            media_info: None,
        }
    }

    #[test]
    fn sample_rule_rejects_short_runtimes() -> Result<()> {
        let spec = NotSampleSpecification;
        let verdict = spec.evaluate(&candidate(30, 50 * 1024 * 1024), &item())?;
        assert_eq!(verdict, SpecDecision::Reject("Sample".to_string()));

        let verdict = spec.evaluate(&candidate(6600, 8 << 30), &item())?;
        assert_eq!(verdict, SpecDecision::Accept);
        Ok(())
    }

    #[test]
    fn minimum_size_of_zero_accepts_everything() -> Result<()> {
        let spec = MinimumSizeSpecification::new(0);
        assert_eq!(
            spec.evaluate(&candidate(6600, 1), &item())?,
            SpecDecision::Accept
        );
        Ok(())
    }

    #[test]
    fn minimum_size_rejection_names_both_sizes() -> Result<()> {
        let spec = MinimumSizeSpecification::new(100);
        let verdict = spec.evaluate(&candidate(6600, 42), &item())?;
        let SpecDecision::Reject(reason) = verdict else {
            panic!("expected a rejection");
        };
        assert!(reason.contains("42"));
        assert!(reason.contains("100"));
        Ok(())
    }

    #[test]
    fn upgrade_rule_defers_to_a_better_existing_file() -> Result<()> {
        let existing = QualityModel::new(Quality::Bluray1080p);
        let spec = UpgradeSpecification::new(Some(existing));
        let mut worse = candidate(6600, 8 << 30);
        worse.quality = QualityModel::new(Quality::Hdtv720p);
        assert!(matches!(
            spec.evaluate(&worse, &item())?,
            SpecDecision::Reject(_)
        ));

        let equal = candidate(6600, 8 << 30);
        assert_eq!(spec.evaluate(&equal, &item())?, SpecDecision::Accept);

        let no_file = UpgradeSpecification::new(None);
        assert_eq!(no_file.evaluate(&worse, &item())?, SpecDecision::Accept);
        Ok(())
    }

    #[test]
    fn full_season_rule_skips_movies() -> Result<()> {
        let spec = FullSeasonSpecification;
        assert_eq!(
            spec.evaluate(&candidate(6600, 8 << 30), &item())?,
            SpecDecision::NotApplicable
        );

        let mut episode_file = candidate(6600, 8 << 30);
        episode_file.kind = MediaKind::Episode;
        episode_file.episode = Some(EpisodeInfo {
            season: 1,
            episodes: Vec::new(),
        });
        assert!(matches!(
            spec.evaluate(&episode_file, &item())?,
            SpecDecision::Reject(_)
        ));
        Ok(())
    }
}
