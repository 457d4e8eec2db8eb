//! Slug derivation and validation for posts and tags.
//!
//! Tag slugs are derived from display names: ASCII text goes through the
//! `slug` crate, CJK characters are transliterated with `pinyin` first so a
//! tag named “基础” becomes `ji-chu`. Post slugs are supplied by callers and
//! only validated.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` must contain only lowercase letters, digits and single hyphens")]
    NotUrlSafe { slug: String },
    #[error("slug exceeds {MAX_SLUG_LEN} characters")]
    TooLong,
}

/// Derive a slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Check that `slug` is usable verbatim as a URL path segment.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }

    let allowed = slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    let well_formed = !slug.starts_with('-') && !slug.ends_with('-') && !slug.contains("--");

    if allowed && well_formed {
        Ok(())
    } else {
        Err(SlugError::NotUrlSafe {
            slug: slug.to_string(),
        })
    }
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            // slugify decides what to do with anything left over
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(derive_slug("Release Notes").unwrap(), "release-notes");
        assert_eq!(derive_slug("  intro ").unwrap(), "intro");
    }

    #[test]
    fn derive_slug_transliterates_chinese() {
        let slug = derive_slug("Rust 基础教程").expect("slug");
        assert_eq!(slug, "rust-ji-chu-jiao-cheng");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_slug_accepts_url_safe_values() {
        assert!(validate_slug("hello-world").is_ok());
        assert!(validate_slug("post-2").is_ok());
    }

    #[test]
    fn validate_slug_rejects_unsafe_values() {
        for bad in ["Hello", "with space", "-leading", "trailing-", "double--dash", "a/b"] {
            assert!(
                matches!(validate_slug(bad), Err(SlugError::NotUrlSafe { .. })),
                "{bad} should be rejected"
            );
        }
        assert_eq!(validate_slug(""), Err(SlugError::EmptyInput));
        assert_eq!(validate_slug(&"a".repeat(201)), Err(SlugError::TooLong));
    }
}
