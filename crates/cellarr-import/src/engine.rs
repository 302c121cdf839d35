//! The import decision engine.
//!
//! Evaluation order per batch: drop paths the store already knows, decide
//! whether folder-level parsed info overrides per-file info, reconcile
//! quality sources, optionally cross-check the parsed quality against the
//! decoded video width and the tier size bands, then run every acceptance
//! rule with per-rule failure isolation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use cellarr_config::{DeepCheckSource, ImportPolicy};
use cellarr_core::{CandidateFile, LibraryItem, MediaFileStore, ParsedReleaseInfo};
use cellarr_quality::{
    Quality, QualityCatalog, QualityComparer, QualityModel, QualitySource, QualitySourceClass,
    SampleCheck, is_sample,
};
use cellarr_telemetry::Metrics;

use crate::decision::{ImportDecision, ImportSpecification, SpecDecision};
use crate::specifications::{
    FullSeasonSpecification, MinimumSizeSpecification, NotSampleSpecification,
};

/// Rejection attached to files the release parser could make nothing of.
const UNPARSED_REJECTION: &str = "Unable to parse file";

/// One batch of scan results for a single parent item.
#[derive(Debug, Default)]
pub struct ImportBatch {
    /// Files the release parser understood.
    pub candidates: Vec<CandidateFile>,
    /// Files the release parser could not interpret at all.
    pub unparsed: Vec<PathBuf>,
    /// Parsed info from the containing folder's name, when the scan had one.
    pub folder_info: Option<ParsedReleaseInfo>,
}

/// Evaluates candidate batches into per-file import decisions.
pub struct ImportDecisionEngine {
    catalog: QualityCatalog,
    policy: ImportPolicy,
    specifications: Vec<Box<dyn ImportSpecification>>,
    store: Arc<dyn MediaFileStore>,
    metrics: Metrics,
}

impl ImportDecisionEngine {
    /// Engine with the built-in rule set derived from the policy.
    #[must_use]
    pub fn new(
        catalog: QualityCatalog,
        policy: ImportPolicy,
        store: Arc<dyn MediaFileStore>,
        metrics: Metrics,
    ) -> Self {
        let specifications: Vec<Box<dyn ImportSpecification>> = vec![
            Box::new(NotSampleSpecification),
            Box::new(MinimumSizeSpecification::new(policy.minimum_file_size)),
            Box::new(FullSeasonSpecification),
        ];
        Self {
            catalog,
            policy,
            specifications,
            store,
            metrics,
        }
    }

    /// Engine with a caller-supplied rule set.
    #[must_use]
    pub fn with_specifications(
        mut self,
        specifications: Vec<Box<dyn ImportSpecification>>,
    ) -> Self {
        self.specifications = specifications;
        self
    }

    /// Evaluate a batch. Accepted decisions come first, ranked best quality
    /// then largest size; rejections follow in input order.
    ///
    /// # Errors
    ///
    /// Returns an error when the persistence layer cannot be queried.
    pub fn decide(&self, batch: ImportBatch, item: &LibraryItem) -> Result<Vec<ImportDecision>> {
        let paths: Vec<PathBuf> = batch
            .candidates
            .iter()
            .map(|candidate| candidate.path.clone())
            .collect();
        let fresh = self.store.filter_existing_files(paths, item)?;
        let candidates: Vec<CandidateFile> = batch
            .candidates
            .into_iter()
            .filter(|candidate| fresh.contains(&candidate.path))
            .collect();

        let folder_info = batch
            .folder_info
            .filter(|_| self.should_use_folder_info(&candidates, item));

        let comparer = QualityComparer::new(&item.profile);
        let mut approved = Vec::new();
        let mut rejected = Vec::new();

        for mut candidate in candidates {
            if let Some(folder) = &folder_info {
                reconcile_folder_quality(&mut candidate, folder, &comparer);
            }
            self.verify_quality(&mut candidate);

            let decision = self.evaluate_rules(candidate, item);
            self.record_decision(&decision);
            if decision.approved_for_import() {
                approved.push(decision);
            } else {
                rejected.push(decision);
            }
        }

        approved.sort_by(|left, right| {
            comparer
                .compare(&right.candidate.quality, &left.candidate.quality)
                .then_with(|| right.candidate.size.cmp(&left.candidate.size))
        });

        let mut decisions = approved;
        decisions.append(&mut rejected);
        for path in batch.unparsed {
            debug!(path = %path.display(), "file name could not be parsed");
            let decision = ImportDecision::rejected(unparsed_candidate(path, item), UNPARSED_REJECTION);
            self.record_decision(&decision);
            decisions.push(decision);
        }
        Ok(decisions)
    }

    /// Folder info may only override per-file info when exactly one file in
    /// the batch is neither a sample nor named with scene conventions.
    fn should_use_folder_info(&self, candidates: &[CandidateFile], item: &LibraryItem) -> bool {
        let qualifying = candidates
            .iter()
            .filter(|candidate| {
                if candidate.scene_name.is_some() {
                    return false;
                }
                let check = SampleCheck {
                    path: &candidate.path,
                    size: candidate.size,
                    quality: &candidate.quality,
                    runtime: candidate.runtime,
                    nominal_runtime: item.nominal_runtime(),
                    is_special: candidate.is_special,
                };
                !is_sample(&check)
            })
            .count();
        qualifying == 1
    }

    /// Cross-check the parsed quality against the decoded width and the tier
    /// size bands to catch mislabeled releases.
    fn verify_quality(&self, candidate: &mut CandidateFile) {
        if !self.policy.enable_media_info || !self.policy.check_quality {
            return;
        }
        let Some(media_info) = &candidate.media_info else {
            return;
        };
        if media_info.width == 0 || candidate.quality.source == QualitySource::MediaInfo {
            return;
        }
        let current = candidate.quality.quality;
        if matches!(current, Quality::Remux1080p | Quality::Remux2160p) {
            return;
        }
        let class = current.source_class();
        if !matches!(
            class,
            QualitySourceClass::Television | QualitySourceClass::Web | QualitySourceClass::Bluray
        ) {
            return;
        }

        let Some(bucket) = resolution_bucket(media_info.width) else {
            return;
        };
        if current.resolution() == Some(bucket) {
            return;
        }

        let corrected = self
            .policy
            .deep_check_band_order
            .iter()
            .filter_map(|source| tier_for(*source, bucket))
            .find(|tier| self.catalog.get(*tier).size_within_band(candidate.size))
            .or_else(|| band_source_for(class).and_then(|source| tier_for(source, bucket)));

        if let Some(corrected) = corrected
            && corrected != current
        {
            debug!(
                path = %candidate.path.display(),
                parsed = current.name(),
                corrected = corrected.name(),
                width = media_info.width,
                "decoded width contradicts the parsed quality"
            );
            candidate.quality = QualityModel {
                quality: corrected,
                revision: candidate.quality.revision,
                source: QualitySource::MediaInfo,
            };
        }
    }

    fn evaluate_rules(&self, candidate: CandidateFile, item: &LibraryItem) -> ImportDecision {
        let mut rejections = Vec::new();
        for specification in &self.specifications {
            match specification.evaluate(&candidate, item) {
                Ok(SpecDecision::Accept) => {}
                Ok(SpecDecision::NotApplicable) => {
                    debug!(
                        rule = specification.name(),
                        path = %candidate.path.display(),
                        "rule not applicable, skipping"
                    );
                }
                Ok(SpecDecision::Reject(reason)) => rejections.push(reason),
                Err(error) => {
                    warn!(
                        rule = specification.name(),
                        path = %candidate.path.display(),
                        error = %error,
                        "rule failed unexpectedly"
                    );
                    rejections.push(format!("{}: {error}", specification.name()));
                }
            }
        }
        ImportDecision {
            candidate,
            rejections,
        }
    }

    fn record_decision(&self, decision: &ImportDecision) {
        let result = if decision.approved_for_import() {
            "approved"
        } else {
            "rejected"
        };
        self.metrics.inc_import_decision(result);
        if decision.rejections.iter().any(|reason| reason == "Sample") {
            self.metrics.inc_sample_detection("sample");
        } else if decision.rejections.iter().any(|reason| reason == "Trailer") {
            self.metrics.inc_sample_detection("trailer");
        }
    }
}

/// Folder quality wins when the folder name follows scene conventions and
/// the file's own quality came from its extension, or when the profile
/// ranks the folder quality strictly higher. Media inspection is never
/// overridden. A folder flagged as a possible special marks the candidate.
fn reconcile_folder_quality(
    candidate: &mut CandidateFile,
    folder: &ParsedReleaseInfo,
    comparer: &QualityComparer<'_>,
) {
    if folder.possible_special {
        candidate.is_special = true;
    }
    if candidate.release_group.is_none() {
        candidate.release_group.clone_from(&folder.release_group);
    }
    if candidate.edition.is_none() {
        candidate.edition.clone_from(&folder.edition);
    }

    // Quality parsed from a non-scene folder name is not trustworthy.
    if !folder.scene_title {
        return;
    }
    if folder.quality.quality == Quality::Unknown {
        return;
    }
    if candidate.quality.source == QualitySource::MediaInfo {
        return;
    }
    let folder_wins = candidate.quality.source == QualitySource::Extension
        || comparer.is_upgrade(&folder.quality, &candidate.quality);
    if folder_wins {
        debug!(
            path = %candidate.path.display(),
            file_quality = %candidate.quality,
            folder_quality = %folder.quality,
            "using quality parsed from the containing folder"
        );
        candidate.quality = QualityModel {
            quality: folder.quality.quality,
            revision: folder.quality.revision,
            source: QualitySource::Folder,
        };
    }
}

/// Placeholder candidate wrapping a path the parser gave up on.
fn unparsed_candidate(path: PathBuf, item: &LibraryItem) -> CandidateFile {
    CandidateFile {
        path,
        kind: item.kind,
        size: 0,
        runtime: None,
        quality: QualityModel::new(Quality::Unknown),
        release_group: None,
        edition: None,
        scene_name: None,
        languages: Vec::new(),
        is_special: false,
        episode: None,
        media_info: None,
    }
}

const fn resolution_bucket(width: u32) -> Option<u32> {
    if width > 2000 {
        Some(2160)
    } else if width > 1400 {
        Some(1080)
    } else if width > 900 {
        Some(720)
    } else {
        None
    }
}

const fn tier_for(source: DeepCheckSource, bucket: u32) -> Option<Quality> {
    match (source, bucket) {
        (DeepCheckSource::Television, 720) => Some(Quality::Hdtv720p),
        (DeepCheckSource::Television, 1080) => Some(Quality::Hdtv1080p),
        (DeepCheckSource::Television, 2160) => Some(Quality::Hdtv2160p),
        (DeepCheckSource::Web, 720) => Some(Quality::WebDl720p),
        (DeepCheckSource::Web, 1080) => Some(Quality::WebDl1080p),
        (DeepCheckSource::Web, 2160) => Some(Quality::WebDl2160p),
        (DeepCheckSource::Bluray, 720) => Some(Quality::Bluray720p),
        (DeepCheckSource::Bluray, 1080) => Some(Quality::Bluray1080p),
        (DeepCheckSource::Bluray, 2160) => Some(Quality::Bluray2160p),
        _ => None,
    }
}

const fn band_source_for(class: QualitySourceClass) -> Option<DeepCheckSource> {
    match class {
        QualitySourceClass::Television => Some(DeepCheckSource::Television),
        QualitySourceClass::Web => Some(DeepCheckSource::Web),
        QualitySourceClass::Bluray => Some(DeepCheckSource::Bluray),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    use cellarr_core::{FileRecord, MediaInfo, MediaKind};
    use cellarr_quality::{QualityProfile, Revision};

    struct FakeStore {
        known: Vec<PathBuf>,
    }

    impl MediaFileStore for FakeStore {
        fn filter_existing_files(
            &self,
            paths: Vec<PathBuf>,
            _item: &LibraryItem,
        ) -> Result<Vec<PathBuf>> {
            Ok(paths
                .into_iter()
                .filter(|path| !self.known.contains(path))
                .collect())
        }

        fn add(&self, record: FileRecord) -> Result<FileRecord> {
            Ok(record)
        }
    }

    fn engine(policy: ImportPolicy, known: Vec<PathBuf>) -> ImportDecisionEngine {
        ImportDecisionEngine::new(
            QualityCatalog::with_defaults(),
            policy,
            Arc::new(FakeStore { known }),
            Metrics::new().expect("metrics registry"),
        )
    }

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

    fn candidate(path: &str, quality: Quality) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(path),
            kind: MediaKind::Movie,
            size: 8 << 30,
            runtime: Some(Duration::from_secs(110 * 60)),
            quality: QualityModel::new(quality),
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
    fn known_paths_are_dropped_before_evaluation() -> Result<()> {
        let known = PathBuf::from("/staging/old.mkv");
        let engine = engine(ImportPolicy::default(), vec![known.clone()]);
        let batch = ImportBatch {
            candidates: vec![
                candidate("/staging/old.mkv", Quality::Bluray1080p),
                candidate("/staging/new.mkv", Quality::Bluray1080p),
            ],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].candidate.path, Path::new("/staging/new.mkv"));
        Ok(())
    }

    #[test]
    fn unparsed_files_are_rejected_not_dropped() -> Result<()> {
        let engine = engine(ImportPolicy::default(), Vec::new());
        let batch = ImportBatch {
            unparsed: vec![PathBuf::from("/staging/garbled.mkv")],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert_eq!(decisions.len(), 1);
        assert_eq!(
            decisions[0].rejections,
            vec![UNPARSED_REJECTION.to_string()]
        );
        Ok(())
    }

    #[test]
    fn folder_quality_overrides_a_lone_unscened_file() -> Result<()> {
        let engine = engine(ImportPolicy::default(), Vec::new());
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Bluray1080p),
            release_group: Some("GRP".to_string()),
            edition: None,
            scene_title: true,
            possible_special: false,
            episode: None,
        };
        let batch = ImportBatch {
            candidates: vec![candidate("/staging/movie.mkv", Quality::Hdtv720p)],
            folder_info: Some(folder),
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        let quality = &decisions[0].candidate.quality;
        assert_eq!(quality.quality, Quality::Bluray1080p);
        assert_eq!(quality.source, QualitySource::Folder);
        assert_eq!(
            decisions[0].candidate.release_group.as_deref(),
            Some("GRP")
        );
        Ok(())
    }

    #[test]
    fn folder_info_is_ignored_when_two_files_qualify() -> Result<()> {
        let engine = engine(ImportPolicy::default(), Vec::new());
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Bluray1080p),
            release_group: None,
            edition: None,
            scene_title: true,
            possible_special: false,
            episode: None,
        };
        let batch = ImportBatch {
            candidates: vec![
                candidate("/staging/cd1.mkv", Quality::Hdtv720p),
                candidate("/staging/cd2.mkv", Quality::Hdtv720p),
            ],
            folder_info: Some(folder),
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert!(decisions
            .iter()
            .all(|decision| decision.candidate.quality.quality == Quality::Hdtv720p));
        Ok(())
    }

    #[test]
    fn media_info_sourced_quality_is_never_overridden() {
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Bluray2160p),
            release_group: None,
            edition: None,
            scene_title: true,
            possible_special: false,
            episode: None,
        };
        let mut file = candidate("/staging/movie.mkv", Quality::Hdtv720p);
        file.quality.source = QualitySource::MediaInfo;
        let profile = QualityProfile::any();
        let comparer = QualityComparer::new(&profile);
        reconcile_folder_quality(&mut file, &folder, &comparer);
        assert_eq!(file.quality.quality, Quality::Hdtv720p);
        assert_eq!(file.quality.source, QualitySource::MediaInfo);
    }

    #[test]
    fn extension_sourced_quality_always_loses_to_the_folder() {
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Sdtv),
            release_group: None,
            edition: None,
            scene_title: true,
            possible_special: false,
            episode: None,
        };
        let mut file = candidate("/staging/movie.avi", Quality::Bluray1080p);
        file.quality.source = QualitySource::Extension;
        let profile = QualityProfile::any();
        let comparer = QualityComparer::new(&profile);
        reconcile_folder_quality(&mut file, &folder, &comparer);
        assert_eq!(file.quality.quality, Quality::Sdtv);
        assert_eq!(file.quality.source, QualitySource::Folder);
    }

    #[test]
    fn deep_check_corrects_a_mislabeled_resolution() -> Result<()> {
        let policy = ImportPolicy {
            check_quality: true,
            ..ImportPolicy::default()
        };
        let engine = engine(policy, Vec::new());
        let mut file = candidate("/staging/movie.mkv", Quality::Hdtv720p);
        file.size = 5 << 30;
        file.media_info = Some(MediaInfo {
            width: 1920,
            height: 1080,
            ..MediaInfo::default()
        });
        let batch = ImportBatch {
            candidates: vec![file],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        let quality = &decisions[0].candidate.quality;
        assert_eq!(quality.quality, Quality::Hdtv1080p);
        assert_eq!(quality.source, QualitySource::MediaInfo);
        Ok(())
    }

    #[test]
    fn deep_check_is_skipped_when_media_inspection_is_disabled() -> Result<()> {
        let policy = ImportPolicy {
            enable_media_info: false,
            check_quality: true,
            ..ImportPolicy::default()
        };
        let engine = engine(policy, Vec::new());
        let mut file = candidate("/staging/movie.mkv", Quality::Hdtv720p);
        file.size = 5 << 30;
        file.media_info = Some(MediaInfo {
            width: 1920,
            height: 1080,
            ..MediaInfo::default()
        });
        let batch = ImportBatch {
            candidates: vec![file],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert_eq!(decisions[0].candidate.quality.quality, Quality::Hdtv720p);
        Ok(())
    }

    #[test]
    fn non_scene_folder_fills_the_group_but_never_the_quality() {
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Bluray1080p),
            release_group: Some("GRP".to_string()),
            edition: None,
            scene_title: false,
            possible_special: false,
            episode: None,
        };
        let mut file = candidate("/staging/movie.mkv", Quality::Hdtv720p);
        let profile = QualityProfile::any();
        let comparer = QualityComparer::new(&profile);
        reconcile_folder_quality(&mut file, &folder, &comparer);
        assert_eq!(file.quality.quality, Quality::Hdtv720p);
        assert_eq!(file.release_group.as_deref(), Some("GRP"));
    }

    #[test]
    fn folder_flagged_as_special_marks_the_candidate() {
        let folder = ParsedReleaseInfo {
            title: "Some Movie".to_string(),
            year: Some(2019),
            quality: QualityModel::new(Quality::Unknown),
            release_group: None,
            edition: None,
            scene_title: true,
            possible_special: true,
            episode: None,
        };
        let mut file = candidate("/staging/behind.the.scenes.mkv", Quality::Hdtv720p);
        let profile = QualityProfile::any();
        let comparer = QualityComparer::new(&profile);
        reconcile_folder_quality(&mut file, &folder, &comparer);
        assert!(file.is_special);
    }

    #[test]
    fn deep_check_preserves_the_revision() -> Result<()> {
        let policy = ImportPolicy {
            check_quality: true,
            ..ImportPolicy::default()
        };
        let engine = engine(policy, Vec::new());
        let mut file = candidate("/staging/movie.mkv", Quality::WebDl720p);
        file.size = 5 << 30;
        file.quality.revision = Revision { version: 2, real: 0 };
        file.media_info = Some(MediaInfo {
            width: 1920,
            height: 1080,
            ..MediaInfo::default()
        });
        let batch = ImportBatch {
            candidates: vec![file],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert_eq!(decisions[0].candidate.quality.revision.version, 2);
        Ok(())
    }

    struct ExplodingRule;

    impl ImportSpecification for ExplodingRule {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn evaluate(&self, _: &CandidateFile, _: &LibraryItem) -> Result<SpecDecision> {
            anyhow::bail!("backing service unreachable")
        }
    }

    struct CountingRule {
        calls: Arc<Mutex<u32>>,
    }

    impl ImportSpecification for CountingRule {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn evaluate(&self, _: &CandidateFile, _: &LibraryItem) -> Result<SpecDecision> {
            *self.calls.lock().unwrap() += 1;
            Ok(SpecDecision::Accept)
        }
    }

    #[test]
    fn a_failing_rule_rejects_the_file_but_not_the_batch() -> Result<()> {
        let calls = Arc::new(Mutex::new(0));
        let engine = engine(ImportPolicy::default(), Vec::new()).with_specifications(vec![
            Box::new(ExplodingRule),
            Box::new(CountingRule {
                calls: Arc::clone(&calls),
            }),
        ]);
        let batch = ImportBatch {
            candidates: vec![
                candidate("/staging/a.mkv", Quality::Bluray1080p),
                candidate("/staging/b.mkv", Quality::Bluray1080p),
            ],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        assert_eq!(decisions.len(), 2);
        for decision in &decisions {
            assert_eq!(decision.rejections.len(), 1);
            assert!(decision.rejections[0].starts_with("exploding:"));
        }
        // The rule after the failing one still ran for every file.
        assert_eq!(*calls.lock().unwrap(), 2);
        Ok(())
    }

    #[test]
    fn approved_decisions_are_ranked_best_first() -> Result<()> {
        let engine = engine(ImportPolicy::default(), Vec::new());
        let mut small = candidate("/staging/small.mkv", Quality::Bluray1080p);
        small.size = 4 << 30;
        let batch = ImportBatch {
            candidates: vec![
                candidate("/staging/hdtv.mkv", Quality::Hdtv720p),
                small,
                candidate("/staging/large.mkv", Quality::Bluray1080p),
            ],
            ..ImportBatch::default()
        };
        let decisions = engine.decide(batch, &item())?;
        let order: Vec<&str> = decisions
            .iter()
            .map(|decision| decision.candidate.path.to_str().unwrap())
            .collect();
        assert_eq!(
            order,
            vec![
                "/staging/large.mkv",
                "/staging/small.mkv",
                "/staging/hdtv.mkv"
            ]
        );
        Ok(())
    }
}
