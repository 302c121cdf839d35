//! Executes approved decisions: renders the library name, runs the verified
//! transfer, persists the record, and emits lifecycle events.
//!
//! Failures are isolated per file. One candidate failing its transfer or its
//! persistence never aborts the remaining candidates in the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use cellarr_config::NamingConfig;
use cellarr_core::{
    CandidateFile, DownloadClientContext, FileRecord, LibraryItem, MediaFileStore,
};
use cellarr_diskops::{
    DiskProvider, HARDLINK_OR_COPY, MOVE_ONLY, TransferMethod, TransferService,
};
use cellarr_events::{Event, EventBus};
use cellarr_naming::FileNameBuilder;
use cellarr_telemetry::Metrics;

use crate::decision::ImportDecision;

/// Final fate of one candidate within an import run.
#[derive(Debug)]
pub enum ImportOutcome {
    /// Transferred, verified, and persisted.
    Imported {
        record: FileRecord,
        method: TransferMethod,
    },
    /// Turned away by the decision engine or the in-run duplicate guard.
    Rejected { reasons: Vec<String> },
    /// Approved but the transfer or persistence step failed.
    Failed { message: String },
}

/// One candidate paired with its outcome.
#[derive(Debug)]
pub struct ImportResult {
    pub candidate: CandidateFile,
    pub outcome: ImportOutcome,
}

impl ImportResult {
    /// True when the candidate landed in the library.
    #[must_use]
    pub fn imported(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Imported { .. })
    }
}

/// Drives approved decisions through transfer and persistence.
pub struct ImportExecutor<P: DiskProvider> {
    transfer: TransferService<P>,
    naming: NamingConfig,
    store: Arc<dyn MediaFileStore>,
    events: EventBus,
    metrics: Metrics,
}

impl<P: DiskProvider> ImportExecutor<P> {
    /// Executor over the given transfer service and collaborators.
    #[must_use]
    pub fn new(
        transfer: TransferService<P>,
        naming: NamingConfig,
        store: Arc<dyn MediaFileStore>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            transfer,
            naming,
            store,
            events,
            metrics,
        }
    }

    /// Run a batch of decisions for one item.
    ///
    /// `new_download` marks candidates arriving from a completed download;
    /// they keep their original path in the stored record and, when the
    /// client still seeds the data, are linked or copied instead of moved.
    pub fn import(
        &self,
        item: &LibraryItem,
        decisions: Vec<ImportDecision>,
        new_download: bool,
        download: Option<&DownloadClientContext>,
    ) -> Vec<ImportResult> {
        self.publish(Event::ImportStarted {
            item_id: item.id,
            candidate_count: decisions.len(),
        });

        let methods = if new_download {
            match download {
                Some(client) if !client.can_move_files => HARDLINK_OR_COPY,
                _ => MOVE_ONLY,
            }
        } else {
            MOVE_ONLY
        };

        let mut results = Vec::with_capacity(decisions.len());
        let mut imported_any = false;

        for decision in decisions {
            let candidate = decision.candidate;
            if !decision.rejections.is_empty() {
                self.publish(Event::ImportRejected {
                    item_id: item.id,
                    path: candidate.path.to_string_lossy().into_owned(),
                    reasons: decision.rejections.clone(),
                });
                results.push(ImportResult {
                    candidate,
                    outcome: ImportOutcome::Rejected {
                        reasons: decision.rejections,
                    },
                });
                continue;
            }

            // Once one candidate lands, every later candidate for the same
            // item in this run is redundant, whatever its quality.
            if imported_any {
                debug!(
                    path = %candidate.path.display(),
                    "a file has already been imported for this item in this run"
                );
                let reason = "A file has already been imported for this item".to_string();
                self.publish(Event::ImportRejected {
                    item_id: item.id,
                    path: candidate.path.to_string_lossy().into_owned(),
                    reasons: vec![reason.clone()],
                });
                results.push(ImportResult {
                    candidate,
                    outcome: ImportOutcome::Rejected {
                        reasons: vec![reason],
                    },
                });
                continue;
            }

            let destination = self.destination_for(item, &candidate);
            match self.import_one(item, &candidate, &destination, methods, new_download) {
                Ok((record, method)) => {
                    imported_any = true;
                    results.push(ImportResult {
                        candidate,
                        outcome: ImportOutcome::Imported { record, method },
                    });
                }
                Err(error) => {
                    warn!(
                        path = %candidate.path.display(),
                        error = %error,
                        "importing candidate failed"
                    );
                    let message = format!("{error:#}");
                    self.publish(Event::ImportFailed {
                        item_id: item.id,
                        path: candidate.path.to_string_lossy().into_owned(),
                        message: message.clone(),
                    });
                    results.push(ImportResult {
                        candidate,
                        outcome: ImportOutcome::Failed { message },
                    });
                }
            }
        }

        if new_download
            && imported_any
            && let Some(client) = download
        {
            self.publish(Event::DownloadImported {
                item_id: item.id,
                download_id: client.download_id.clone(),
                replaced_paths: Vec::new(),
            });
        }

        results
    }

    fn import_one(
        &self,
        item: &LibraryItem,
        candidate: &CandidateFile,
        destination: &Path,
        methods: &[TransferMethod],
        new_download: bool,
    ) -> Result<(FileRecord, TransferMethod)> {
        self.publish(Event::TransferProgress {
            path: candidate.path.to_string_lossy().into_owned(),
            step: "transferring".to_string(),
        });
        let method = self
            .transfer
            .transfer_file(&candidate.path, destination, methods)
            .with_context(|| {
                format!("transferring to {}", destination.display())
            })
            .inspect_err(|_| {
                self.metrics
                    .inc_transfer_operation(methods[0].as_str(), "failure");
            })?;
        self.metrics
            .inc_transfer_operation(method.as_str(), "success");
        self.publish(Event::TransferProgress {
            path: candidate.path.to_string_lossy().into_owned(),
            step: "verified".to_string(),
        });

        let relative_path = destination
            .strip_prefix(&item.path)
            .map_or_else(
                |_| destination.to_string_lossy().into_owned(),
                |relative| relative.to_string_lossy().into_owned(),
            );
        let record = FileRecord {
            item_id: item.id,
            relative_path,
            original_file_path: new_download
                .then(|| candidate.path.to_string_lossy().into_owned()),
            size: candidate.size,
            date_added: Utc::now(),
            quality: candidate.quality.clone(),
            release_group: candidate.release_group.clone(),
            edition: candidate.edition.clone(),
            scene_name: candidate.scene_name.clone(),
            languages: candidate.languages.clone(),
        };
        let stored = self.store.add(record).context("persisting file record")?;

        info!(
            path = %candidate.path.display(),
            destination = %destination.display(),
            method = method.as_str(),
            "imported file"
        );
        self.publish(Event::FileImported {
            item_id: item.id,
            library_path: destination.to_string_lossy().into_owned(),
            size_bytes: candidate.size,
        });
        Ok((stored, method))
    }

    /// Rendered final path for a candidate inside the item's folder.
    fn destination_for(&self, item: &LibraryItem, candidate: &CandidateFile) -> PathBuf {
        let builder = FileNameBuilder::new(&self.naming);
        let file_name = builder.build_file_name(item, candidate);
        let extension = candidate
            .path
            .extension()
            .map(|extension| extension.to_string_lossy().into_owned())
            .unwrap_or_default();
        builder.build_path(item, &file_name, &extension)
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    use cellarr_config::TransferPolicy;
    use cellarr_core::MediaKind;
    use cellarr_diskops::LocalDiskProvider;
    use cellarr_quality::{Quality, QualityModel, QualityProfile};

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<FileRecord>>,
    }

    impl MediaFileStore for RecordingStore {
        fn filter_existing_files(
            &self,
            paths: Vec<PathBuf>,
            _item: &LibraryItem,
        ) -> Result<Vec<PathBuf>> {
            Ok(paths)
        }

        fn add(&self, record: FileRecord) -> Result<FileRecord> {
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }
    }

    fn executor(store: Arc<RecordingStore>) -> ImportExecutor<LocalDiskProvider> {
        ImportExecutor::new(
            TransferService::new(LocalDiskProvider::new(), TransferPolicy::default()),
            NamingConfig::default(),
            store,
            EventBus::new(),
            Metrics::new().expect("metrics registry"),
        )
    }

    fn item(library: &Path) -> LibraryItem {
        LibraryItem {
            id: Uuid::new_v4(),
            kind: MediaKind::Movie,
            title: "The Matrix".to_string(),
            year: 1999,
            runtime_minutes: 136,
            path: library.join("The Matrix (1999)"),
            profile: QualityProfile::any(),
        }
    }

    fn candidate(path: &Path, quality: Quality) -> CandidateFile {
        CandidateFile {
            path: path.to_path_buf(),
            kind: MediaKind::Movie,
            size: 11,
            runtime: Some(Duration::from_secs(136 * 60)),
            quality: QualityModel::new(quality),
            release_group: Some("GRP".to_string()),
            edition: None,
            scene_name: None,
            languages: Vec::new(),
            is_special: false,
            episode: None,
            media_info: None,
        }
    }

    fn stage_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"fake bytes.").expect("stage file");
        path
    }

    #[test]
    fn approved_candidate_lands_under_the_rendered_name() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let source = stage_file(&staging, "some.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());
        let decision = ImportDecision::approved(candidate(&source, Quality::Bluray1080p));

        let results = executor.import(&item, vec![decision], false, None);
        assert_eq!(results.len(), 1);
        assert!(results[0].imported());

        let destination = item.path.join("The Matrix (1999) Bluray-1080p.mkv");
        assert!(destination.exists());
        assert!(!source.exists(), "move import must consume the source");

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relative_path, "The Matrix (1999) Bluray-1080p.mkv");
        assert_eq!(records[0].original_file_path, None);
        Ok(())
    }

    #[test]
    fn seeding_download_is_copied_and_keeps_its_original_path() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let source = stage_file(&staging, "some.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());
        let decision = ImportDecision::approved(candidate(&source, Quality::Bluray1080p));
        let download = DownloadClientContext {
            download_id: "abc123".to_string(),
            output_path: Some(staging.clone()),
            can_move_files: false,
        };

        let results = executor.import(&item, vec![decision], true, Some(&download));
        assert!(results[0].imported());
        assert!(source.exists(), "seeding source must stay in place");

        let records = store.records.lock().unwrap();
        assert_eq!(
            records[0].original_file_path.as_deref(),
            Some(source.to_str().unwrap())
        );
        Ok(())
    }

    #[test]
    fn second_candidate_with_the_same_destination_is_turned_away() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let first = stage_file(&staging, "first.release.mkv");
        let second = stage_file(&staging, "second.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());

        let results = executor.import(
            &item,
            vec![
                ImportDecision::approved(candidate(&first, Quality::Bluray1080p)),
                ImportDecision::approved(candidate(&second, Quality::Bluray1080p)),
            ],
            false,
            None,
        );
        assert!(results[0].imported());
        let ImportOutcome::Rejected { reasons } = &results[1].outcome else {
            panic!("expected the duplicate to be rejected");
        };
        assert!(reasons[0].contains("already been imported"));
        assert!(second.exists(), "rejected duplicate must not be touched");
        assert_eq!(store.records.lock().unwrap().len(), 1);
        Ok(())
    }

    #[test]
    fn only_the_best_candidate_imports_even_across_qualities() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let best = stage_file(&staging, "best.release.mkv");
        let lesser = stage_file(&staging, "lesser.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());

        // Ranked input: different qualities render different destinations,
        // but the item only needs one file per run.
        let results = executor.import(
            &item,
            vec![
                ImportDecision::approved(candidate(&best, Quality::Bluray1080p)),
                ImportDecision::approved(candidate(&lesser, Quality::Hdtv720p)),
            ],
            false,
            None,
        );
        assert!(results[0].imported());
        assert!(matches!(results[1].outcome, ImportOutcome::Rejected { .. }));
        assert!(lesser.exists());
        assert!(!item.path.join("The Matrix (1999) HDTV-720p.mkv").exists());
        assert_eq!(store.records.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn transfer_progress_is_surfaced_around_the_move() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let source = stage_file(&staging, "some.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let events = EventBus::new();
        let executor = ImportExecutor::new(
            TransferService::new(LocalDiskProvider::new(), TransferPolicy::default()),
            NamingConfig::default(),
            store,
            events.clone(),
            Metrics::new().expect("metrics registry"),
        );
        let item = item(temp.path());
        let decision = ImportDecision::approved(candidate(&source, Quality::Bluray1080p));

        let results = executor.import(&item, vec![decision], false, None);
        assert!(results[0].imported());

        let mut stream = events.subscribe(Some(0));
        let mut kinds = Vec::new();
        let mut steps = Vec::new();
        while let Some(envelope) = stream.next().await {
            if let Event::TransferProgress { step, .. } = &envelope.event {
                steps.push(step.clone());
            }
            kinds.push(envelope.event.kind());
            if envelope.id == events.last_event_id().unwrap_or_default() {
                break;
            }
        }
        assert_eq!(
            kinds,
            vec![
                "import_started",
                "transfer_progress",
                "transfer_progress",
                "file_imported",
            ]
        );
        assert_eq!(steps, vec!["transferring", "verified"]);
        Ok(())
    }

    #[test]
    fn engine_rejections_pass_through_without_touching_disk() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let source = stage_file(&staging, "sample.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());
        let decision = ImportDecision::rejected(candidate(&source, Quality::Bluray1080p), "Sample");

        let results = executor.import(&item, vec![decision], false, None);
        let ImportOutcome::Rejected { reasons } = &results[0].outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(reasons, &vec!["Sample".to_string()]);
        assert!(source.exists());
        assert!(store.records.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn one_failing_transfer_does_not_abort_the_run() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging)?;
        let blocked = stage_file(&staging, "blocked.release.mkv");
        let fine = stage_file(&staging, "fine.release.mkv");

        let store = Arc::new(RecordingStore::default());
        let executor = executor(Arc::clone(&store));
        let item = item(temp.path());

        // Occupy the first candidate's destination so its transfer refuses.
        fs::create_dir_all(&item.path)?;
        fs::write(item.path.join("The Matrix (1999) Bluray-1080p.mkv"), b"old")?;

        let results = executor.import(
            &item,
            vec![
                ImportDecision::approved(candidate(&blocked, Quality::Bluray1080p)),
                ImportDecision::approved(candidate(&fine, Quality::Hdtv720p)),
            ],
            false,
            None,
        );
        assert!(matches!(results[0].outcome, ImportOutcome::Failed { .. }));
        assert!(results[1].imported());
        assert!(item.path.join("The Matrix (1999) HDTV-720p.mkv").exists());
        Ok(())
    }
}
