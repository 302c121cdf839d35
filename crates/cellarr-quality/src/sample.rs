//! Runtime- and size-based sample/trailer detection.
//!
//! The primary signal is the measured play duration compared against a
//! minimum derived from the parent item's nominal runtime. When the probe
//! tool is unavailable the classifier falls back to a fixed size ceiling,
//! doubled for tiers known to produce large samples. Deterministic; the only
//! side effect is logging.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error};

use crate::model::{Quality, QualityModel};

/// Size ceiling for the no-runtime fallback.
const SAMPLE_SIZE_LIMIT: u64 = 70 * 1024 * 1024;

/// Tiers whose legitimate samples routinely exceed the base ceiling.
const LARGE_SAMPLE_QUALITIES: [Quality; 3] = [
    Quality::Hdtv1080p,
    Quality::WebDl1080p,
    Quality::Bluray1080p,
];

/// Container-only/streaming placeholder extensions exempt from sample checks.
const EXEMPT_EXTENSIONS: [&str; 3] = ["flv", "strm", "ts"];

/// Inputs to one classification. Borrowed; the classifier owns nothing.
#[derive(Debug, Clone, Copy)]
pub struct SampleCheck<'a> {
    pub path: &'a Path,
    pub size: u64,
    pub quality: &'a QualityModel,
    /// Measured play duration; `None` when the probe tool is unavailable.
    pub runtime: Option<Duration>,
    /// Nominal runtime of the parent item, when known.
    pub nominal_runtime: Option<Duration>,
    /// Specials/bonus items are exempt from sample classification.
    pub is_special: bool,
}

/// Whether the file looks like a sample rather than genuine content.
#[must_use]
pub fn is_sample(check: &SampleCheck<'_>) -> bool {
    if check.is_special {
        debug!(path = %check.path.display(), "special item, skipping sample check");
        return false;
    }

    if has_exempt_extension(check.path) {
        debug!(path = %check.path.display(), "placeholder extension, skipping sample check");
        return false;
    }

    match check.runtime {
        Some(runtime) => runtime_indicates_sample(check, runtime),
        None => size_indicates_sample(check),
    }
}

/// Whether the file looks like a promotional trailer.
///
/// Trailers must announce themselves: the file name has to contain the
/// literal substring "trailer" before any heuristic applies.
#[must_use]
pub fn is_trailer(check: &SampleCheck<'_>) -> bool {
    if check.is_special {
        return false;
    }

    let name = check
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if !name.to_lowercase().contains("trailer") {
        return false;
    }

    match check.runtime {
        Some(runtime) => runtime_indicates_sample(check, runtime),
        None => size_indicates_sample(check),
    }
}

fn has_exempt_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            EXEMPT_EXTENSIONS
                .iter()
                .any(|exempt| ext.eq_ignore_ascii_case(exempt))
        })
}

fn runtime_indicates_sample(check: &SampleCheck<'_>, runtime: Duration) -> bool {
    if runtime.is_zero() {
        // An unreadable file measures as zero; treat it as a sample so it is
        // never imported over real content.
        error!(
            path = %check.path.display(),
            "file has a runtime of 0, is it a valid video file?"
        );
        return true;
    }

    let minimum = minimum_allowed_runtime(check.nominal_runtime);
    if runtime < minimum {
        debug!(
            path = %check.path.display(),
            runtime_secs = runtime.as_secs(),
            minimum_secs = minimum.as_secs(),
            "runtime is below the minimum allowed, classifying as sample"
        );
        return true;
    }

    false
}

fn size_indicates_sample(check: &SampleCheck<'_>) -> bool {
    let limit = if LARGE_SAMPLE_QUALITIES.contains(&check.quality.quality) {
        SAMPLE_SIZE_LIMIT * 2
    } else {
        SAMPLE_SIZE_LIMIT
    };

    if check.size < limit {
        debug!(
            path = %check.path.display(),
            size = check.size,
            limit,
            "no runtime available and size is below the limit, classifying as sample"
        );
        return true;
    }

    false
}

/// Minimum plausible runtime derived from the parent item's nominal length.
///
/// Short content gets fixed floors; feature-length content uses a fifth of
/// the nominal runtime capped at ten minutes.
fn minimum_allowed_runtime(nominal: Option<Duration>) -> Duration {
    let nominal_minutes = nominal.map_or(0, |duration| duration.as_secs() / 60);

    match nominal_minutes {
        0..=3 => Duration::from_secs(15),
        4..=10 => Duration::from_secs(90),
        11..=30 => Duration::from_secs(300),
        minutes => Duration::from_secs((minutes * 60 / 5).min(600)),
    }
}
