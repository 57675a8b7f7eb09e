//! URL slugs derived from article titles.
//!
//! A slug keeps word characters (Unicode letters, digits, underscore),
//! lower-cases them and joins words with single hyphens. Collisions with an
//! existing slug are resolved by the caller with [`with_timestamp_suffix`].

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::ParseError;

fn strip_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid slug strip pattern"))
}

fn separator_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("valid slug separator pattern"))
}

/// Derive the base slug for `title`.
pub fn slugify(title: &str) -> Result<String, ParseError> {
    let stripped = strip_pattern().replace_all(title, "");
    let lowered = stripped.trim().to_lowercase();
    let slug = separator_pattern().replace_all(&lowered, "-").into_owned();

    if !slug.chars().any(|c| c.is_alphanumeric() || c == '_') {
        return Err(ParseError::EmptySlug);
    }
    Ok(slug)
}

/// `<base>-<unix seconds>`, used when `base` is already taken.
pub fn with_timestamp_suffix(base: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", base, now.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_basic_title() {
        assert_eq!(slugify("Hello World").unwrap(), "hello-world");
    }

    #[test]
    fn test_punctuation_removed() {
        assert_eq!(
            slugify("Breaking: Markets rally 5%!").unwrap(),
            "breaking-markets-rally-5"
        );
    }

    #[test]
    fn test_whitespace_and_hyphen_runs_collapse() {
        assert_eq!(slugify("  a  -  b --- c  ").unwrap(), "a-b-c");
    }

    #[test]
    fn test_unicode_letters_kept() {
        assert_eq!(slugify("Tin tức Việt Nam").unwrap(), "tin-tức-việt-nam");
    }

    #[test]
    fn test_deterministic() {
        let title = "Same Title, Same Slug";
        assert_eq!(slugify(title).unwrap(), slugify(title).unwrap());
    }

    #[test]
    fn test_no_word_characters_rejected() {
        assert_eq!(slugify("?!... --"), Err(ParseError::EmptySlug));
        assert_eq!(slugify(""), Err(ParseError::EmptySlug));
    }

    #[test]
    fn test_timestamp_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            with_timestamp_suffix("hello-world", now),
            format!("hello-world-{}", now.timestamp())
        );
    }
}
