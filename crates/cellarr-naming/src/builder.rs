//! Renders library file and folder names from the configured templates.

use std::path::PathBuf;

use tracing::debug;

use cellarr_config::NamingConfig;
use cellarr_core::{CandidateFile, LibraryItem};

use crate::cleanup::{
    clean_file_name, clean_folder_name, clean_title, tidy_separators, title_first_character,
    title_the,
};
use crate::media_formatter;
use crate::token::{TokenHandlers, TokenMatch, replace_tokens, token_count};

/// Release group substituted when a file carries none.
const FALLBACK_RELEASE_GROUP: &str = "Cellarr";

/// Template renderer for library file and folder names.
pub struct FileNameBuilder<'a> {
    config: &'a NamingConfig,
}

impl<'a> FileNameBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a NamingConfig) -> Self {
        Self { config }
    }

    /// Render the file name (no extension) for a candidate joining an item.
    ///
    /// With renaming disabled the original scene or base name is kept
    /// verbatim.
    #[must_use]
    pub fn build_file_name(&self, item: &LibraryItem, file: &CandidateFile) -> String {
        if !self.config.rename_files {
            debug!(path = %file.path.display(), "renaming disabled, keeping original name");
            return file.scene_or_base_name();
        }

        let pattern = &self.config.standard_file_format;
        let multiple_tokens = token_count(pattern) > 1;

        let mut handlers = TokenHandlers::new();
        Self::register_item_tokens(&mut handlers, item);
        Self::register_file_tokens(&mut handlers, file, multiple_tokens);

        let rendered = replace_tokens(pattern, &handlers, self.config);
        tidy_separators(rendered.trim())
    }

    /// Render the item's library folder name from the folder template.
    /// Quality and media tokens resolve only when a candidate is supplied.
    #[must_use]
    pub fn item_folder(&self, item: &LibraryItem, file: Option<&CandidateFile>) -> String {
        let pattern = &self.config.folder_format;
        let multiple_tokens = token_count(pattern) > 1;

        let mut handlers = TokenHandlers::new();
        Self::register_item_tokens(&mut handlers, item);
        if let Some(file) = file {
            Self::register_file_tokens(&mut handlers, file, multiple_tokens);
        }

        let rendered = replace_tokens(pattern, &handlers, self.config);
        clean_folder_name(&tidy_separators(rendered.trim()))
    }

    /// Final absolute path of an imported file inside the item's folder.
    #[must_use]
    pub fn build_path(&self, item: &LibraryItem, file_name: &str, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            item.path.join(file_name)
        } else {
            item.path.join(format!("{file_name}.{extension}"))
        }
    }

    fn register_item_tokens<'b>(handlers: &mut TokenHandlers<'b>, item: &'b LibraryItem) {
        handlers.insert("{Movie Title}", move |_| item.title.clone());
        handlers.insert("{Movie CleanTitle}", move |_| clean_title(&item.title));
        handlers.insert("{Movie TitleThe}", move |_| title_the(&item.title));
        handlers.insert("{Movie TitleFirstCharacter}", move |_| {
            title_first_character(&item.title)
        });
        handlers.insert("{Release Year}", move |_| {
            if item.year > 0 {
                item.year.to_string()
            } else {
                String::new()
            }
        });
    }

    fn register_file_tokens<'b>(
        handlers: &mut TokenHandlers<'b>,
        file: &'b CandidateFile,
        multiple_tokens: bool,
    ) {
        handlers.insert("{Quality Title}", move |_| {
            file.quality.quality.name().to_string()
        });
        handlers.insert("{Quality Full}", move |_| {
            let mut full = file.quality.quality.name().to_string();
            if file.quality.revision.is_repack() {
                full.push_str(" Proper");
            }
            if file.quality.revision.is_real() {
                full.push_str(" REAL");
            }
            full
        });
        handlers.insert("{Release Group}", move |token| {
            file.release_group
                .clone()
                .filter(|group| !group.trim().is_empty())
                .unwrap_or_else(|| token.default_value(FALLBACK_RELEASE_GROUP))
        });
        handlers.insert("{Edition Tags}", move |_| {
            file.edition.clone().unwrap_or_default()
        });
        handlers.insert("{Season}", move |token| {
            file.episode
                .as_ref()
                .map_or_else(String::new, |episode| {
                    pad_number(u32::from(episode.season), token)
                })
        });
        handlers.insert("{Episode}", move |token| {
            file.episode.as_ref().map_or_else(String::new, |episode| {
                episode
                    .episodes
                    .iter()
                    .map(|number| pad_number(u32::from(*number), token))
                    .collect::<Vec<_>>()
                    .join("-")
            })
        });

        if let Some(media_info) = &file.media_info {
            let scene_name = file.scene_or_base_name();
            handlers.insert("{MediaInfo VideoCodec}", move |_| {
                media_formatter::video_codec(media_info, &scene_name)
            });
            handlers.insert("{MediaInfo AudioCodec}", move |_| {
                media_formatter::audio_codec(media_info)
            });
            handlers.insert("{MediaInfo AudioChannels}", move |_| {
                media_formatter::audio_channels(media_info)
            });
            handlers.insert("{MediaInfo AudioLanguages}", move |_| {
                media_formatter::audio_languages(media_info)
            });
        }

        // Echoing the entire release name inside a larger template produces
        // unreadable duplication, so these only resolve when standing alone.
        if !multiple_tokens {
            handlers.insert("{Original Title}", move |_| file.scene_or_base_name());
            handlers.insert("{Original Filename}", move |_| file.base_name());
        }
    }
}

/// Zero-pad a numeric token according to its `:00` style format.
fn pad_number(value: u32, token: &TokenMatch) -> String {
    let width = token
        .custom_format
        .as_deref()
        .filter(|format| !format.is_empty() && format.chars().all(|ch| ch == '0'))
        .map_or(1, str::len);
    format!("{value:0width$}")
}

/// Illegal character handling for names produced outside the template path,
/// e.g. folder names derived from parsed release titles.
#[must_use]
pub fn sanitise(name: &str, config: &NamingConfig) -> String {
    clean_file_name(
        name,
        config.replace_illegal_characters,
        config.colon_replacement,
    )
}
