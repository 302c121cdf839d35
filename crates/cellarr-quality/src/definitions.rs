//! Display titles and size bands per quality tier.
//!
//! The size bands back the deep verification step: a file whose byte size
//! falls inside a tier's band is a plausible member of that tier. Bands are
//! deliberately generous and overlapping; precedence between overlapping
//! bands is the caller's policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Quality;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Display title plus the plausible byte-size band for one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDefinition {
    pub quality: Quality,
    /// Human-facing title used by the naming renderer.
    pub title: String,
    /// Minimum plausible size in bytes; `None` means unbounded below.
    pub min_size: Option<u64>,
    /// Maximum plausible size in bytes; `None` means unbounded above.
    pub max_size: Option<u64>,
}

impl QualityDefinition {
    fn new(quality: Quality, min_size: Option<u64>, max_size: Option<u64>) -> Self {
        Self {
            quality,
            title: quality.name().to_string(),
            min_size,
            max_size,
        }
    }

    /// Whether `size` falls strictly inside the band.
    #[must_use]
    pub fn size_within_band(&self, size: u64) -> bool {
        let above_min = self.min_size.is_none_or(|min| size > min);
        let below_max = self.max_size.is_none_or(|max| size < max);
        above_min && below_max
    }
}

/// Catalog of quality definitions with built-in defaults and override support.
#[derive(Debug, Clone)]
pub struct QualityCatalog {
    definitions: HashMap<Quality, QualityDefinition>,
}

impl QualityCatalog {
    /// Catalog seeded with the built-in defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut definitions = HashMap::new();
        for definition in default_definitions() {
            definitions.insert(definition.quality, definition);
        }
        Self { definitions }
    }

    /// Replace the stored definition for a tier.
    pub fn upsert(&mut self, definition: QualityDefinition) {
        self.definitions.insert(definition.quality, definition);
    }

    /// Look up the definition for a tier. Every tier has a default entry.
    #[must_use]
    pub fn get(&self, quality: Quality) -> &QualityDefinition {
        self.definitions
            .get(&quality)
            .unwrap_or_else(|| &self.definitions[&Quality::Unknown])
    }

    /// Display title for a tier.
    #[must_use]
    pub fn title(&self, quality: Quality) -> &str {
        &self.get(quality).title
    }
}

impl Default for QualityCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_definitions() -> Vec<QualityDefinition> {
    vec![
        QualityDefinition::new(Quality::Unknown, None, None),
        QualityDefinition::new(Quality::WorkPrint, None, None),
        QualityDefinition::new(Quality::Cam, None, None),
        QualityDefinition::new(Quality::TeleSync, None, None),
        QualityDefinition::new(Quality::TeleCine, None, None),
        QualityDefinition::new(Quality::Regional, None, None),
        QualityDefinition::new(Quality::Dvdscr, None, None),
        QualityDefinition::new(Quality::Sdtv, Some(200 * MIB), Some(2 * GIB)),
        QualityDefinition::new(Quality::Dvd, Some(300 * MIB), Some(5 * GIB)),
        QualityDefinition::new(Quality::DvdR, Some(2 * GIB), Some(10 * GIB)),
        QualityDefinition::new(Quality::WebDl480p, Some(200 * MIB), Some(3 * GIB)),
        QualityDefinition::new(Quality::Bluray480p, Some(300 * MIB), Some(5 * GIB)),
        QualityDefinition::new(Quality::Hdtv720p, Some(700 * MIB), Some(8 * GIB)),
        QualityDefinition::new(Quality::WebDl720p, Some(800 * MIB), Some(10 * GIB)),
        QualityDefinition::new(Quality::Bluray720p, Some(GIB), Some(15 * GIB)),
        QualityDefinition::new(Quality::Hdtv1080p, Some(GIB), Some(12 * GIB)),
        QualityDefinition::new(Quality::WebDl1080p, Some(GIB + GIB / 4), Some(20 * GIB)),
        QualityDefinition::new(Quality::Bluray1080p, Some(2 * GIB), Some(35 * GIB)),
        QualityDefinition::new(Quality::Remux1080p, Some(10 * GIB), None),
        QualityDefinition::new(Quality::Hdtv2160p, Some(3 * GIB), Some(40 * GIB)),
        QualityDefinition::new(Quality::WebDl2160p, Some(3 * GIB), Some(60 * GIB)),
        QualityDefinition::new(Quality::Bluray2160p, Some(4 * GIB), Some(90 * GIB)),
        QualityDefinition::new(Quality::Remux2160p, Some(20 * GIB), None),
    ]
}
