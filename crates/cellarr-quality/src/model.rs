//! Quality tier vocabulary shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Ranked encoding quality tiers recognised by the release parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Unknown,
    WorkPrint,
    Cam,
    TeleSync,
    TeleCine,
    Regional,
    Dvdscr,
    Sdtv,
    Dvd,
    DvdR,
    WebDl480p,
    Bluray480p,
    Hdtv720p,
    WebDl720p,
    Bluray720p,
    Hdtv1080p,
    WebDl1080p,
    Bluray1080p,
    Remux1080p,
    Hdtv2160p,
    WebDl2160p,
    Bluray2160p,
    Remux2160p,
}

impl Quality {
    /// All tiers in canonical worst-to-best order. Used as the fallback
    /// ranking when a profile does not list a tier explicitly.
    pub const ALL: [Quality; 23] = [
        Quality::Unknown,
        Quality::WorkPrint,
        Quality::Cam,
        Quality::TeleSync,
        Quality::TeleCine,
        Quality::Regional,
        Quality::Dvdscr,
        Quality::Sdtv,
        Quality::Dvd,
        Quality::DvdR,
        Quality::WebDl480p,
        Quality::Bluray480p,
        Quality::Hdtv720p,
        Quality::WebDl720p,
        Quality::Bluray720p,
        Quality::Hdtv1080p,
        Quality::WebDl1080p,
        Quality::Bluray1080p,
        Quality::Remux1080p,
        Quality::Hdtv2160p,
        Quality::WebDl2160p,
        Quality::Bluray2160p,
        Quality::Remux2160p,
    ];

    /// Canonical display name, matching scene naming conventions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Quality::Unknown => "Unknown",
            Quality::WorkPrint => "WORKPRINT",
            Quality::Cam => "CAM",
            Quality::TeleSync => "TELESYNC",
            Quality::TeleCine => "TELECINE",
            Quality::Regional => "REGIONAL",
            Quality::Dvdscr => "DVDSCR",
            Quality::Sdtv => "SDTV",
            Quality::Dvd => "DVD",
            Quality::DvdR => "DVD-R",
            Quality::WebDl480p => "WEBDL-480p",
            Quality::Bluray480p => "Bluray-480p",
            Quality::Hdtv720p => "HDTV-720p",
            Quality::WebDl720p => "WEBDL-720p",
            Quality::Bluray720p => "Bluray-720p",
            Quality::Hdtv1080p => "HDTV-1080p",
            Quality::WebDl1080p => "WEBDL-1080p",
            Quality::Bluray1080p => "Bluray-1080p",
            Quality::Remux1080p => "Remux-1080p",
            Quality::Hdtv2160p => "HDTV-2160p",
            Quality::WebDl2160p => "WEBDL-2160p",
            Quality::Bluray2160p => "Bluray-2160p",
            Quality::Remux2160p => "Remux-2160p",
        }
    }

    /// Broad source class, used by the deep verification step to stay within
    /// the same family when correcting a mislabeled release.
    #[must_use]
    pub const fn source_class(self) -> QualitySourceClass {
        match self {
            Quality::Unknown => QualitySourceClass::Unknown,
            Quality::WorkPrint | Quality::Cam | Quality::TeleSync | Quality::TeleCine => {
                QualitySourceClass::Theatre
            }
            Quality::Regional | Quality::Dvdscr | Quality::Dvd | Quality::DvdR => {
                QualitySourceClass::Dvd
            }
            Quality::Sdtv | Quality::Hdtv720p | Quality::Hdtv1080p | Quality::Hdtv2160p => {
                QualitySourceClass::Television
            }
            Quality::WebDl480p
            | Quality::WebDl720p
            | Quality::WebDl1080p
            | Quality::WebDl2160p => QualitySourceClass::Web,
            Quality::Bluray480p
            | Quality::Bluray720p
            | Quality::Bluray1080p
            | Quality::Bluray2160p
            | Quality::Remux1080p
            | Quality::Remux2160p => QualitySourceClass::Bluray,
        }
    }

    /// Nominal horizontal resolution for the tier, when it implies one.
    #[must_use]
    pub const fn resolution(self) -> Option<u32> {
        match self {
            Quality::WebDl480p | Quality::Bluray480p => Some(480),
            Quality::Hdtv720p | Quality::WebDl720p | Quality::Bluray720p => Some(720),
            Quality::Hdtv1080p
            | Quality::WebDl1080p
            | Quality::Bluray1080p
            | Quality::Remux1080p => Some(1080),
            Quality::Hdtv2160p
            | Quality::WebDl2160p
            | Quality::Bluray2160p
            | Quality::Remux2160p => Some(2160),
            _ => None,
        }
    }

    /// Position in the canonical worst-to-best ranking.
    #[must_use]
    pub fn canonical_weight(self) -> usize {
        Quality::ALL
            .iter()
            .position(|quality| *quality == self)
            .unwrap_or(0)
    }
}

/// Broad origin family for a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySourceClass {
    Unknown,
    Theatre,
    Dvd,
    Television,
    Web,
    Bluray,
}

/// Where a quality classification came from. Stronger sources must not be
/// overridden by weaker ones during folder reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySource {
    /// Parsed from the release or file name.
    Name,
    /// Guessed purely from the file extension; the weakest source.
    Extension,
    /// Inferred from decoded media facts; the strongest source.
    MediaInfo,
    /// Taken from the containing folder's parsed info.
    Folder,
}

/// Proper/real fix markers attached to a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    /// Release version; anything above 1 is a proper/repack.
    pub version: u32,
    /// Count of REAL fixes applied on top of the version.
    pub real: u32,
}

impl Default for Revision {
    fn default() -> Self {
        Self {
            version: 1,
            real: 0,
        }
    }
}

impl Revision {
    /// A proper or repack re-release.
    #[must_use]
    pub const fn is_repack(&self) -> bool {
        self.version > 1
    }

    /// Carries a REAL fix marker.
    #[must_use]
    pub const fn is_real(&self) -> bool {
        self.real > 0
    }
}

/// Immutable pairing of a quality tier with its revision markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityModel {
    pub quality: Quality,
    pub revision: Revision,
    pub source: QualitySource,
}

impl QualityModel {
    /// Build a model for a tier with a default first-release revision.
    #[must_use]
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            revision: Revision::default(),
            source: QualitySource::Name,
        }
    }

    /// Build a model carrying an explicit source.
    #[must_use]
    pub fn with_source(quality: Quality, source: QualitySource) -> Self {
        Self {
            quality,
            revision: Revision::default(),
            source,
        }
    }
}

impl Default for QualityModel {
    fn default() -> Self {
        Self::new(Quality::Unknown)
    }
}

impl std::fmt::Display for QualityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.quality.name())?;
        if self.revision.is_repack() {
            write!(f, " v{}", self.revision.version)?;
        }
        if self.revision.is_real() {
            write!(f, " REAL")?;
        }
        Ok(())
    }
}
