//! Typed policy records for naming, import decisions, and disk transfers.
//!
//! # Design
//! - Pure data carriers; no IO or wiring code lives here.
//! - String-coded enums implement `FromStr` for settings-table round trips.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Naming configuration applied when rendering library file and folder names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Whether files are renamed at all; when false the original name wins.
    pub rename_files: bool,
    /// Whether illegal filesystem characters are substituted or stripped.
    pub replace_illegal_characters: bool,
    /// Replacement applied to colons in rendered names.
    pub colon_replacement: ColonReplacement,
    /// Template for file names, e.g. `{Movie Title} ({Release Year}) {Quality Full}`.
    pub standard_file_format: String,
    /// Template for the item folder, e.g. `{Movie Title} ({Release Year})`.
    pub folder_format: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            rename_files: true,
            replace_illegal_characters: true,
            colon_replacement: ColonReplacement::Delete,
            standard_file_format: "{Movie Title} ({Release Year}) {Quality Full}".to_string(),
            folder_format: "{Movie Title} ({Release Year})".to_string(),
        }
    }
}

/// Replacement policy for colons, which are illegal on most filesystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColonReplacement {
    /// Remove the colon entirely.
    Delete,
    /// Replace the colon with a dash.
    Dash,
    /// Replace the colon with a space followed by a dash.
    SpaceDash,
    /// Replace the colon with a dash surrounded by spaces.
    SpaceDashSpace,
}

impl ColonReplacement {
    /// Literal text substituted for each colon.
    #[must_use]
    pub const fn replacement(self) -> &'static str {
        match self {
            Self::Delete => "",
            Self::Dash => "-",
            Self::SpaceDash => " -",
            Self::SpaceDashSpace => " - ",
        }
    }
}

impl FromStr for ColonReplacement {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(Self::Delete),
            "dash" => Ok(Self::Dash),
            "space_dash" => Ok(Self::SpaceDash),
            "space_dash_space" => Ok(Self::SpaceDashSpace),
            other => Err(ConfigError::invalid_value("colon_replacement", other)),
        }
    }
}

/// Source class consulted by the deep quality verification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepCheckSource {
    /// Broadcast captures (HDTV tiers).
    Television,
    /// Web downloads (WEBDL tiers).
    Web,
    /// Disc sources (Bluray tiers).
    Bluray,
}

/// Policy knobs for the import decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPolicy {
    /// Whether media inspection runs at all during decision making.
    pub enable_media_info: bool,
    /// Whether the deep width/size quality cross-check is performed.
    pub check_quality: bool,
    /// Candidates below this many bytes are rejected outright.
    pub minimum_file_size: u64,
    /// Precedence among overlapping size bands during the deep check.
    ///
    /// The original heuristics carry overlapping thresholds with no canonical
    /// winner; the order here is authoritative and the first matching band
    /// wins.
    pub deep_check_band_order: Vec<DeepCheckSource>,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            enable_media_info: true,
            check_quality: false,
            minimum_file_size: 0,
            deep_check_band_order: vec![
                DeepCheckSource::Television,
                DeepCheckSource::Web,
                DeepCheckSource::Bluray,
            ],
        }
    }
}

/// Verification strength applied to disk transfers.
///
/// Ordered from cheapest to strongest. `TryTransactional` resolves to a
/// concrete mode per operation based on the mounts involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Fire and forget; no post-transfer checks.
    None,
    /// Verify the destination size afterwards and roll back on mismatch.
    VerifyOnly,
    /// Attempt the sidecar-based transactional path where the mounts allow it.
    TryTransactional,
    /// Always use the sidecar-based transactional path.
    Transactional,
}

impl FromStr for VerificationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "verify_only" => Ok(Self::VerifyOnly),
            "try_transactional" => Ok(Self::TryTransactional),
            "transactional" => Ok(Self::Transactional),
            other => Err(ConfigError::invalid_value("verification_mode", other)),
        }
    }
}

/// Policy knobs for the transfer protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPolicy {
    /// Verification applied when the caller does not request otherwise.
    pub default_verification: VerificationMode,
    /// Whether an existing destination file may be replaced.
    pub overwrite: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            default_verification: VerificationMode::TryTransactional,
            overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn colon_replacement_round_trips_from_settings_strings() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            ColonReplacement::from_str("space_dash_space")?,
            ColonReplacement::SpaceDashSpace
        );
        assert_eq!(ColonReplacement::SpaceDashSpace.replacement(), " - ");
        assert!(ColonReplacement::from_str("smart").is_err());
        Ok(())
    }

    #[test]
    fn verification_mode_rejects_unknown_values() {
        assert!(VerificationMode::from_str("paranoid").is_err());
        assert_eq!(
            VerificationMode::from_str("try_transactional").ok(),
            Some(VerificationMode::TryTransactional)
        );
    }

    #[test]
    fn default_import_policy_orders_bands_like_the_source_heuristics() {
        let policy = ImportPolicy::default();
        assert_eq!(
            policy.deep_check_band_order,
            vec![
                DeepCheckSource::Television,
                DeepCheckSource::Web,
                DeepCheckSource::Bluray
            ]
        );
    }

    #[test]
    fn naming_config_serialises_with_snake_case_enums() -> Result<(), Box<dyn Error>> {
        let config = NamingConfig::default();
        let json = serde_json::to_string(&config)?;
        assert!(json.contains("\"colon_replacement\":\"delete\""));
        Ok(())
    }
}
