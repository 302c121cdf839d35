//! Display names for codec, channel, and language facts in templates.

use cellarr_core::MediaInfo;

/// Scene-style video codec label. AVC and HEVC releases conventionally carry
/// `x264`/`x265` for encodes and `h264`/`h265` for untouched streams, so the
/// original release name decides which flavour applies.
#[must_use]
pub fn video_codec(media_info: &MediaInfo, scene_name: &str) -> String {
    let format = media_info.video_format.as_str();
    let scene = scene_name.to_lowercase();

    if format.contains("AVC") || format.contains("V_MPEG4/ISO/AVC") {
        if scene.contains("h264") {
            return "h264".to_string();
        }
        return "x264".to_string();
    }
    if format.contains("HEVC") || format.contains("V_MPEGH/ISO/HEVC") {
        if scene.contains("h265") {
            return "h265".to_string();
        }
        return "x265".to_string();
    }
    if format.contains("MPEG-2") || format.contains("MPEG Video") {
        return "MPEG2".to_string();
    }
    if format.contains("XviD") {
        return "XviD".to_string();
    }
    if format.contains("DivX") || format.contains("DX50") {
        return "DivX".to_string();
    }
    format.to_string()
}

/// Scene-style audio codec label.
#[must_use]
pub fn audio_codec(media_info: &MediaInfo) -> String {
    let format = media_info.audio_format.as_str();

    if format.contains("E-AC-3") {
        return "EAC3".to_string();
    }
    if format.contains("AC-3") {
        return "AC3".to_string();
    }
    if format.contains("MPEG Audio") {
        if media_info.audio_profile == "Layer 3" {
            return "MP3".to_string();
        }
        return format.to_string();
    }
    if format.contains("TrueHD") {
        return "TrueHD".to_string();
    }
    if format.contains("DTS") {
        return "DTS".to_string();
    }
    if format.contains("FLAC") {
        return "FLAC".to_string();
    }
    if format.contains("AAC") {
        return "AAC".to_string();
    }
    format.to_string()
}

/// Channel count rendered the scene way, e.g. `5.1` or `2.0`.
#[must_use]
pub fn audio_channels(media_info: &MediaInfo) -> String {
    format!("{:.1}", media_info.audio_channels)
}

/// Bracketed audio language tag, skipped entirely for English-only audio.
/// Multiple languages join with `+`: `[EN+DE]`.
#[must_use]
pub fn audio_languages(media_info: &MediaInfo) -> String {
    let codes: Vec<&str> = media_info
        .audio_languages
        .iter()
        .map(|language| language_code(language))
        .collect();

    if codes.is_empty() || codes.iter().all(|code| *code == "EN") {
        return String::new();
    }
    format!("[{}]", codes.join("+"))
}

fn language_code(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "english" | "eng" | "en" => "EN",
        "french" | "fre" | "fra" | "fr" => "FR",
        "german" | "ger" | "deu" | "de" => "DE",
        "spanish" | "spa" | "es" => "ES",
        "italian" | "ita" | "it" => "IT",
        "japanese" | "jpn" | "ja" => "JA",
        "korean" | "kor" | "ko" => "KO",
        "dutch" | "dut" | "nld" | "nl" => "NL",
        "portuguese" | "por" | "pt" => "PT",
        "russian" | "rus" | "ru" => "RU",
        "chinese" | "chi" | "zho" | "zh" => "ZH",
        _ => "UND",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn media_info() -> MediaInfo {
        MediaInfo {
            width: 1920,
            height: 1080,
            video_format: "AVC".to_string(),
            audio_format: "DTS".to_string(),
            audio_profile: String::new(),
            audio_channels: 5.1,
            audio_languages: vec!["English".to_string()],
            subtitle_languages: Vec::new(),
            run_time: Duration::from_secs(5400),
        }
    }

    #[test]
    fn avc_flavour_follows_the_scene_name() {
        let info = media_info();
        assert_eq!(video_codec(&info, "Movie.2019.1080p.BluRay.x264-GRP"), "x264");
        assert_eq!(video_codec(&info, "Movie.2019.1080p.WEB.h264-GRP"), "h264");
        assert_eq!(video_codec(&info, ""), "x264");
    }

    #[test]
    fn eac3_is_matched_before_ac3() {
        let mut info = media_info();
        info.audio_format = "E-AC-3".to_string();
        assert_eq!(audio_codec(&info), "EAC3");
        info.audio_format = "AC-3".to_string();
        assert_eq!(audio_codec(&info), "AC3");
    }

    #[test]
    fn mp3_needs_the_layer_profile() {
        let mut info = media_info();
        info.audio_format = "MPEG Audio".to_string();
        info.audio_profile = "Layer 3".to_string();
        assert_eq!(audio_codec(&info), "MP3");
    }

    #[test]
    fn channels_render_with_one_decimal() {
        let mut info = media_info();
        assert_eq!(audio_channels(&info), "5.1");
        info.audio_channels = 2.0;
        assert_eq!(audio_channels(&info), "2.0");
    }

    #[test]
    fn english_only_audio_renders_no_language_tag() {
        let mut info = media_info();
        assert_eq!(audio_languages(&info), "");
        info.audio_languages = vec!["English".to_string(), "German".to_string()];
        assert_eq!(audio_languages(&info), "[EN+DE]");
    }
}
