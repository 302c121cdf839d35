//! Sample fixtures used to preview naming templates in settings screens.
//!
//! Factory functions return fresh values on every call so previews can never
//! leak state between renders.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use cellarr_core::{CandidateFile, EpisodeInfo, LibraryItem, MediaInfo, MediaKind};
use cellarr_quality::{Quality, QualityModel, QualityProfile};

/// A representative movie and candidate for template previews.
#[must_use]
pub fn preview_movie() -> (LibraryItem, CandidateFile) {
    let item = LibraryItem {
        id: Uuid::new_v4(),
        kind: MediaKind::Movie,
        title: "The Movie: Title".to_string(),
        year: 2010,
        runtime_minutes: 105,
        path: PathBuf::from("/library/The Movie Title (2010)"),
        profile: QualityProfile::any(),
    };
    let file = CandidateFile {
        path: PathBuf::from("/staging/The.Movie.Title.2010.1080p.BluRay.x264-EVOLVE/movie.mkv"),
        kind: MediaKind::Movie,
        size: 8 * 1024 * 1024 * 1024,
        runtime: Some(Duration::from_secs(105 * 60)),
        quality: QualityModel::new(Quality::Bluray1080p),
        release_group: Some("EVOLVE".to_string()),
        edition: Some("Ultimate Extended Edition".to_string()),
        scene_name: Some("The.Movie.Title.2010.1080p.BluRay.x264-EVOLVE".to_string()),
        languages: vec!["english".to_string()],
        is_special: false,
        episode: None,
        media_info: Some(preview_media_info()),
    };
    (item, file)
}

/// A representative episode and candidate for template previews.
#[must_use]
pub fn preview_episode() -> (LibraryItem, CandidateFile) {
    let item = LibraryItem {
        id: Uuid::new_v4(),
        kind: MediaKind::Episode,
        title: "The Series Title!".to_string(),
        year: 2010,
        runtime_minutes: 45,
        path: PathBuf::from("/library/The Series Title! (2010)"),
        profile: QualityProfile::any(),
    };
    let file = CandidateFile {
        path: PathBuf::from(
            "/staging/The.Series.Title.S01E01.720p.HDTV.x264-EVOLVE/episode.mkv",
        ),
        kind: MediaKind::Episode,
        size: 1024 * 1024 * 1024,
        runtime: Some(Duration::from_secs(45 * 60)),
        quality: QualityModel::new(Quality::Hdtv720p),
        release_group: Some("EVOLVE".to_string()),
        edition: None,
        scene_name: Some("The.Series.Title.S01E01.720p.HDTV.x264-EVOLVE".to_string()),
        languages: vec!["english".to_string()],
        is_special: false,
        episode: Some(EpisodeInfo {
            season: 1,
            episodes: vec![1],
        }),
        media_info: Some(preview_media_info()),
    };
    (item, file)
}

fn preview_media_info() -> MediaInfo {
    MediaInfo {
        width: 1920,
        height: 1080,
        video_format: "AVC".to_string(),
        audio_format: "DTS".to_string(),
        audio_profile: String::new(),
        audio_channels: 5.1,
        audio_languages: vec!["English".to_string()],
        subtitle_languages: vec!["English".to_string()],
        run_time: Duration::from_secs(105 * 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellarr_config::NamingConfig;

    use crate::builder::FileNameBuilder;

    #[test]
    fn each_call_returns_an_independent_fixture() {
        let (first, _) = preview_movie();
        let (second, _) = preview_movie();
        assert_ne!(first.id, second.id);
        assert_eq!(first.title, second.title);
    }

    #[test]
    fn movie_fixture_renders_the_default_template() {
        let config = NamingConfig::default();
        let builder = FileNameBuilder::new(&config);
        let (item, file) = preview_movie();
        let name = builder.build_file_name(&item, &file);
        assert_eq!(name, "The Movie Title (2010) Bluray-1080p");
    }

    #[test]
    fn episode_fixture_carries_episode_numbering() {
        let (_, file) = preview_episode();
        let episode = file.episode.expect("episode fixture has numbering");
        assert_eq!(episode.season, 1);
        assert_eq!(episode.episodes, vec![1]);
    }
}
