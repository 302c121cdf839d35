//! Filesystem-safe cleanup applied to rendered names.

use once_cell::sync::Lazy;
use regex::Regex;

use cellarr_config::ColonReplacement;

/// Windows reserved device names that cannot be used as file stems.
static RESERVED_DEVICE_NAMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:aux|com[1-9]|con|lpt[1-9]|nul|prn)(?:\..+)?$")
        .expect("reserved name pattern must compile")
});

/// Leading articles to rotate behind the title, keeping trailing
/// parenthesised qualifiers (year, country) in place.
static TITLE_THE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(The|An|A) (.*?)((?: *\([^)]+\))*)$").expect("article pattern must compile")
});

/// Orphaned punctuation stranded between spaces after other cleanup.
static DANGLING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\s)[,<>/\\;:'"|`~!?@$%^*\-_=](\s)"#).expect("punctuation pattern must compile")
});

/// Punctuation dropped when followed by a plural/contraction tail,
/// whitespace, or the end of the title.
static TRAILING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['":?,]((?:[sm] )|\s|$)"#).expect("punctuation pattern must compile")
});

static BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[()\[\]{}]").expect("bracket pattern must compile"));

static MULTI_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("space pattern must compile"));

const SEPARATORS: [char; 4] = ['-', ' ', '.', '_'];

/// Collapse runs of the same separator character and trim trailing
/// separators, so collapsed tokens never leave `Movie - .mkv` debris.
#[must_use]
pub fn tidy_separators(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous: Option<char> = None;
    for ch in name.chars() {
        if SEPARATORS.contains(&ch) && previous == Some(ch) {
            continue;
        }
        out.push(ch);
        previous = Some(ch);
    }
    out.trim_end_matches(|ch| SEPARATORS.contains(&ch)).to_string()
}

/// Strip or substitute characters that are illegal in file names.
///
/// With `replace` set, each offender maps to a harmless stand-in and colons
/// follow the configured replacement. Without it everything is removed.
#[must_use]
pub fn clean_file_name(name: &str, replace: bool, colon_replacement: ColonReplacement) -> String {
    const BAD: [char; 8] = ['\\', '/', '<', '>', '?', '*', '|', '"'];
    const GOOD: [&str; 8] = ["+", "+", "", "", "!", "-", "", ""];

    let mut result = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch == ':' {
            if replace {
                result.push_str(colon_replacement.replacement());
            }
        } else if let Some(index) = BAD.iter().position(|bad| *bad == ch) {
            if replace {
                result.push_str(GOOD[index]);
            }
        } else {
            result.push(ch);
        }
    }

    let result = result
        .trim_start_matches([' ', '.'])
        .trim_end_matches(' ')
        .to_string();

    if RESERVED_DEVICE_NAMES.is_match(&result) {
        return result.replace('.', "_");
    }
    result
}

/// Folder names additionally shed trailing dots, which Windows drops
/// silently and which then break path round trips.
#[must_use]
pub fn clean_folder_name(name: &str) -> String {
    let collapsed = MULTI_SPACE.replace_all(name, " ");
    collapsed.trim_matches([' ', '.']).to_string()
}

/// Scene-style title cleanup: `&` becomes `and`, slashes become spaces,
/// brackets and stray punctuation disappear.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let replaced = title.replace('&', "and").replace(['/', '\\'], " ");
    let replaced = TRAILING_PUNCTUATION.replace_all(&replaced, "$1");
    let replaced = DANGLING_PUNCTUATION.replace_all(&replaced, "$1$2");
    let replaced = BRACKETS.replace_all(&replaced, "");
    let replaced = MULTI_SPACE.replace_all(&replaced, " ");
    replaced.trim().to_string()
}

/// Move a leading article to the end: `The Matrix (1999)` sorts as
/// `Matrix, The (1999)`.
#[must_use]
pub fn title_the(title: &str) -> String {
    TITLE_THE.replace(title, "$2, $1$3").into_owned()
}

/// First alphanumeric character of the title, uppercased, for A-Z folder
/// fan-out. Titles with no alphanumerics land under `_`.
#[must_use]
pub fn title_first_character(title: &str) -> String {
    title
        .chars()
        .find(char::is_ascii_alphanumeric)
        .map_or_else(|| "_".to_string(), |ch| ch.to_ascii_uppercase().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_separators_collapse_to_one() {
        assert_eq!(tidy_separators("Movie..Name--2019"), "Movie.Name-2019");
        assert_eq!(tidy_separators("Movie Name - "), "Movie Name");
    }

    #[test]
    fn mixed_separator_runs_are_left_alone() {
        // Only runs of the same character collapse.
        assert_eq!(tidy_separators("Movie -.Name"), "Movie -.Name");
    }

    #[test]
    fn tidy_separators_is_idempotent() {
        let once = tidy_separators("A...B---C   ");
        assert_eq!(tidy_separators(&once), once);
    }

    #[test]
    fn illegal_characters_are_substituted_when_enabled() {
        let cleaned = clean_file_name("What If...?: Part 1 *uncut*", true, ColonReplacement::Dash);
        assert_eq!(cleaned, "What If...!- Part 1 -uncut-");
    }

    #[test]
    fn illegal_characters_are_stripped_when_disabled() {
        let cleaned = clean_file_name("a/b:c|d", false, ColonReplacement::Dash);
        assert_eq!(cleaned, "abcd");
    }

    #[test]
    fn reserved_device_names_have_dots_replaced() {
        let cleaned = clean_file_name("con.2021.mkv", true, ColonReplacement::Delete);
        assert_eq!(cleaned, "con_2021_mkv");
        let fine = clean_file_name("conan.2021.mkv", true, ColonReplacement::Delete);
        assert_eq!(fine, "conan.2021.mkv");
    }

    #[test]
    fn folder_names_never_end_with_a_dot() {
        assert_eq!(clean_folder_name("Akira (1988)."), "Akira (1988)");
        assert_eq!(clean_folder_name("  Akira  (1988) "), "Akira (1988)");
    }

    #[test]
    fn clean_title_scenifies_punctuation() {
        assert_eq!(clean_title("Mission: Impossible"), "Mission Impossible");
        assert_eq!(clean_title("Fast & Furious"), "Fast and Furious");
        assert_eq!(clean_title("Face/Off"), "Face Off");
        assert_eq!(clean_title("Ocean's Eleven (2001)"), "Oceans Eleven 2001");
    }

    #[test]
    fn article_rotates_behind_the_title_keeping_qualifiers() {
        assert_eq!(title_the("The Matrix (1999)"), "Matrix, The (1999)");
        assert_eq!(title_the("An American Tail"), "American Tail, An");
        assert_eq!(title_the("Heat"), "Heat");
    }

    #[test]
    fn first_character_skips_punctuation() {
        assert_eq!(title_first_character("The Matrix"), "T");
        assert_eq!(title_first_character("'71"), "7");
        assert_eq!(title_first_character("..."), "_");
    }
}
