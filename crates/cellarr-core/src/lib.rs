//! Pipeline-agnostic domain model and collaborator interfaces.
//!
//! The import pipeline consumes its surroundings (persistence, media
//! inspection, release parsing) through the narrow traits defined here; the
//! host application supplies the implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cellarr_quality::{QualityModel, QualityProfile};

/// Kind of library content a candidate file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Episode,
}

/// Episode-specific facts carried by episode candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub season: u16,
    pub episodes: Vec<u16>,
}

/// A file on disk being considered for import, plus everything parsed or
/// measured about it. Owned exclusively by one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub size: u64,
    /// Measured play duration; `None` when the probe tool is unavailable.
    pub runtime: Option<Duration>,
    pub quality: QualityModel,
    pub release_group: Option<String>,
    pub edition: Option<String>,
    /// Original scene release name, when the file was matched to one.
    pub scene_name: Option<String>,
    pub languages: Vec<String>,
    /// Bonus/special content exempt from sample classification.
    pub is_special: bool,
    pub episode: Option<EpisodeInfo>,
    /// Decoded media facts, populated when inspection ran.
    pub media_info: Option<MediaInfo>,
}

impl CandidateFile {
    /// Base name without extension, used when renaming is disabled.
    #[must_use]
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Scene name if known, otherwise the file's base name.
    #[must_use]
    pub fn scene_or_base_name(&self) -> String {
        self.scene_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.base_name())
    }
}

/// The parent movie or series a candidate is being imported for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: Uuid,
    pub kind: MediaKind,
    pub title: String,
    /// Release year; zero when unknown.
    pub year: i32,
    /// Nominal runtime in minutes; zero when unknown.
    pub runtime_minutes: u32,
    /// Root folder of the item inside the library.
    pub path: PathBuf,
    pub profile: QualityProfile,
}

impl LibraryItem {
    /// Nominal runtime as a duration, when known.
    #[must_use]
    pub fn nominal_runtime(&self) -> Option<Duration> {
        (self.runtime_minutes > 0)
            .then(|| Duration::from_secs(u64::from(self.runtime_minutes) * 60))
    }
}

/// Decoded facts about a media file's streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Raw video format identifier, e.g. `AVC` or `V_MPEGH/ISO/HEVC`.
    pub video_format: String,
    /// Raw audio format identifier, e.g. `E-AC-3` or `MPEG Audio`.
    pub audio_format: String,
    /// Codec profile qualifier, e.g. `Layer 3` for MP3.
    pub audio_profile: String,
    pub audio_channels: f64,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
    pub run_time: Duration,
}

/// Result of probing a file with the media inspection tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The tool ran and produced stream facts.
    Analyzed(MediaInfo),
    /// The tool is not installed or not runnable; distinct from a broken file.
    ToolUnavailable,
}

/// Media inspection collaborator.
pub trait MediaProbe: Send + Sync {
    /// Inspect a file, distinguishing tool absence from file errors.
    ///
    /// # Errors
    ///
    /// Returns an error when the tool ran but the file could not be read.
    fn probe(&self, path: &Path) -> anyhow::Result<ProbeOutcome>;
}

/// Parsed facts extracted from a release or folder name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedReleaseInfo {
    pub title: String,
    pub year: Option<i32>,
    pub quality: QualityModel,
    pub release_group: Option<String>,
    pub edition: Option<String>,
    /// The name follows scene release conventions.
    pub scene_title: bool,
    /// Likely a special/bonus item (e.g. a season-zero episode).
    pub possible_special: bool,
    pub episode: Option<EpisodeInfo>,
}

/// Release name parsing collaborator.
pub trait ReleaseParser: Send + Sync {
    /// Parse a file or folder name; `None` when nothing usable was found.
    fn parse(&self, name: &str) -> Option<ParsedReleaseInfo>;
}

/// The record handed to the persistence layer after a successful import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub item_id: Uuid,
    /// Final path relative to the item's library folder.
    pub relative_path: String,
    /// Path the file had inside the download before import.
    pub original_file_path: Option<String>,
    pub size: u64,
    pub date_added: DateTime<Utc>,
    pub quality: QualityModel,
    pub release_group: Option<String>,
    pub edition: Option<String>,
    pub scene_name: Option<String>,
    pub languages: Vec<String>,
}

/// Persistence collaborator owning the stored file records.
pub trait MediaFileStore: Send + Sync {
    /// Drop paths already known to the store for this item.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be queried.
    fn filter_existing_files(
        &self,
        paths: Vec<PathBuf>,
        item: &LibraryItem,
    ) -> anyhow::Result<Vec<PathBuf>>;

    /// Persist a new file record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be stored.
    fn add(&self, record: FileRecord) -> anyhow::Result<FileRecord>;
}

/// Facts about the download client that produced a batch of candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientContext {
    pub download_id: String,
    /// Completed download directory reported by the client.
    pub output_path: Option<PathBuf>,
    /// False when the client still seeds the data; import must copy.
    pub can_move_files: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellarr_quality::Quality;

    fn candidate(path: &str) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(path),
            kind: MediaKind::Movie,
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

    #[test]
    fn scene_name_wins_over_base_name_when_present() {
        let mut file = candidate("/staging/abc123/movie file.mkv");
        assert_eq!(file.scene_or_base_name(), "movie file");

        file.scene_name = Some("Some.Movie.2019.1080p.BluRay.x264-GRP".to_string());
        assert_eq!(
            file.scene_or_base_name(),
            "Some.Movie.2019.1080p.BluRay.x264-GRP"
        );
    }

    #[test]
    fn blank_scene_name_falls_back_to_base_name() {
        let mut file = candidate("/staging/movie.mkv");
        file.scene_name = Some("   ".to_string());
        assert_eq!(file.scene_or_base_name(), "movie");
    }

    #[test]
    fn nominal_runtime_is_absent_when_unknown() {
        let item = LibraryItem {
            id: Uuid::nil(),
            kind: MediaKind::Movie,
            title: "The Matrix".to_string(),
            year: 1999,
            runtime_minutes: 0,
            path: PathBuf::from("/library/The Matrix (1999)"),
            profile: QualityProfile::any(),
        };
        assert!(item.nominal_runtime().is_none());
    }
}
