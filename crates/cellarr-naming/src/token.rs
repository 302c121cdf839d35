//! Token grammar and substitution.
//!
//! A token looks like `{prefix}name:format{suffix}` where prefix and suffix
//! are literal separator characters emitted only when the replacement is
//! non-empty. Token-name casing steers the replacement casing, and an
//! embedded separator (`{Movie.Title}`) replaces spaces inside that token's
//! replacement only.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use cellarr_config::NamingConfig;

use crate::cleanup::clean_file_name;

/// Grammar for one bracketed token.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\{(?P<prefix>[- ._\[(]*)(?P<token>[a-z0-9]+(?:(?P<separator>[- ._]+)[a-z0-9]+)?)(?::(?P<custom>[ ,a-z0-9|+-]*[a-z0-9|+]))?(?P<suffix>[- ._)\]]*)\}",
    )
    .expect("token grammar must compile")
});

/// One matched token handed to a replacement handler.
#[derive(Debug, Clone)]
pub struct TokenMatch {
    pub prefix: String,
    pub token: String,
    pub separator: Option<String>,
    pub custom_format: Option<String>,
    pub suffix: String,
}

impl TokenMatch {
    /// Default used by tokens that only render a fallback when they stand
    /// alone, without surrounding punctuation.
    #[must_use]
    pub fn default_value(&self, default: &str) -> String {
        if self.prefix.is_empty() && self.suffix.is_empty() {
            default.to_string()
        } else {
            String::new()
        }
    }
}

/// Replacement handler for one token name.
pub type TokenHandler<'a> = Box<dyn Fn(&TokenMatch) -> String + 'a>;

/// Token-name keyed handler table. Keys are normalised so `{Movie Title}`,
/// `{movie.title}` and `{MOVIE_TITLE}` all resolve to the same handler.
pub struct TokenHandlers<'a> {
    handlers: HashMap<String, TokenHandler<'a>>,
}

impl<'a> TokenHandlers<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a `{Token Name}` key.
    pub fn insert(&mut self, key: &str, handler: impl Fn(&TokenMatch) -> String + 'a) {
        self.handlers.insert(normalise_key(key), Box::new(handler));
    }

    fn get(&self, token: &str) -> Option<&TokenHandler<'a>> {
        self.handlers.get(&normalise_key(token))
    }
}

impl Default for TokenHandlers<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Case- and separator-insensitive handler key.
fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Number of tokens present in a pattern. Original-name tokens go silent in
/// multi-token patterns to avoid echoing the whole release name mid-template.
#[must_use]
pub fn token_count(pattern: &str) -> usize {
    TOKEN_REGEX.find_iter(pattern).count()
}

/// Substitute every token in `pattern` using the registered handlers.
#[must_use]
pub fn replace_tokens(pattern: &str, handlers: &TokenHandlers<'_>, config: &NamingConfig) -> String {
    TOKEN_REGEX
        .replace_all(pattern, |captures: &Captures<'_>| {
            replace_token(captures, handlers, config)
        })
        .into_owned()
}

fn replace_token(
    captures: &Captures<'_>,
    handlers: &TokenHandlers<'_>,
    config: &NamingConfig,
) -> String {
    let token_match = TokenMatch {
        prefix: captures
            .name("prefix")
            .map_or_else(String::new, |m| m.as_str().to_string()),
        token: captures
            .name("token")
            .map_or_else(String::new, |m| m.as_str().to_string()),
        separator: captures
            .name("separator")
            .map(|m| m.as_str().to_string())
            .filter(|sep| !sep.trim().is_empty()),
        custom_format: captures.name("custom").map(|m| m.as_str().to_string()),
        suffix: captures
            .name("suffix")
            .map_or_else(String::new, |m| m.as_str().to_string()),
    };

    let mut replacement = handlers
        .get(&token_match.token)
        .map_or_else(String::new, |handler| handler(&token_match))
        .trim()
        .to_string();

    replacement = apply_token_casing(&token_match.token, replacement);

    if let Some(separator) = &token_match.separator {
        replacement = replacement.replace(' ', separator);
    }

    replacement = clean_file_name(
        &replacement,
        config.replace_illegal_characters,
        config.colon_replacement,
    );

    if replacement.is_empty() {
        return replacement;
    }

    format!("{}{replacement}{}", token_match.prefix, token_match.suffix)
}

/// All-lowercase token names lower the replacement, all-uppercase names
/// raise it, and mixed case passes the natural casing through.
fn apply_token_casing(token: &str, replacement: String) -> String {
    let letters: Vec<char> = token.chars().filter(|ch| ch.is_alphabetic()).collect();
    if letters.is_empty() {
        return replacement;
    }

    if letters.iter().all(char::is_ascii_lowercase) {
        replacement.to_lowercase()
    } else if letters.iter().all(char::is_ascii_uppercase) {
        replacement.to_uppercase()
    } else {
        replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NamingConfig {
        NamingConfig::default()
    }

    fn handlers<'a>(title: &'a str, group: &'a str) -> TokenHandlers<'a> {
        let mut handlers = TokenHandlers::new();
        handlers.insert("{Movie Title}", move |_| title.to_string());
        handlers.insert("{Release Group}", move |_| group.to_string());
        handlers
    }

    #[test]
    fn prefix_and_suffix_collapse_for_empty_replacements() {
        let handlers = handlers("The Matrix", "");
        let rendered = replace_tokens("{Movie Title}{-Release Group}", &handlers, &config());
        assert_eq!(rendered, "The Matrix");
    }

    #[test]
    fn prefix_and_suffix_survive_for_non_empty_replacements() {
        let handlers = handlers("The Matrix", "GRP");
        let rendered = replace_tokens("{Movie Title}{-Release Group}", &handlers, &config());
        assert_eq!(rendered, "The Matrix-GRP");
    }

    #[test]
    fn token_casing_follows_the_token_name() {
        let handlers = handlers("The Matrix", "GRP");
        assert_eq!(
            replace_tokens("{movie title}", &handlers, &config()),
            "the matrix"
        );
        assert_eq!(
            replace_tokens("{MOVIE TITLE}", &handlers, &config()),
            "THE MATRIX"
        );
        assert_eq!(
            replace_tokens("{Movie Title}", &handlers, &config()),
            "The Matrix"
        );
    }

    #[test]
    fn token_separator_replaces_spaces_within_that_token_only() {
        let handlers = handlers("The Matrix", "GRP");
        let rendered = replace_tokens(
            "{Movie.Title} with {Movie Title}",
            &handlers,
            &config(),
        );
        assert_eq!(rendered, "The.Matrix with The Matrix");
    }

    #[test]
    fn unknown_tokens_render_as_nothing() {
        let handlers = handlers("The Matrix", "GRP");
        assert_eq!(replace_tokens("{Nope Nope}", &handlers, &config()), "");
    }

    #[test]
    fn token_count_sees_every_token() {
        assert_eq!(token_count("{Movie Title} ({Release Year}) {Quality Full}"), 3);
        assert_eq!(token_count("static text"), 0);
    }
}
