//! Slug rules: how a title becomes a URL-safe token and how collisions are
//! suffixed.
//!
//! Everything here is pure. Probing the store for a free candidate is the
//! job of [`crate::store::PostStore`].

use crate::error::DomainError;

/// Maximum length of a slug, in characters.
pub const SLUG_MAX_CHARS: usize = 200;

/// Normalize a title into a slug: lowercased, non-alphanumerics replaced
/// with single hyphens, no leading or trailing hyphen.
///
/// Non-ASCII letters are transliterated (`Crème brûlée` becomes
/// `creme-brulee`). Titles with nothing representable are rejected.
pub fn normalize(title: &str) -> Result<String, DomainError> {
    let slug = ::slug::slugify(title);
    let slug = clamp(&slug, SLUG_MAX_CHARS);

    if slug.is_empty() {
        return Err(DomainError::Validation(format!(
            "cannot derive a slug from title `{title}`"
        )));
    }

    Ok(slug.to_string())
}

/// The `attempt`-th candidate for `base`: `base` itself, then `base-1`,
/// `base-2`, and so on. The base is shortened when needed so the result
/// stays within [`SLUG_MAX_CHARS`].
pub fn candidate(base: &str, attempt: u64) -> String {
    if attempt == 0 {
        return clamp(base, SLUG_MAX_CHARS).to_string();
    }

    let suffix = format!("-{attempt}");
    let room = SLUG_MAX_CHARS.saturating_sub(suffix.len());
    format!("{}{suffix}", clamp(base, room))
}

/// Check an explicitly supplied slug.
pub fn validate(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() {
        return Err(DomainError::Validation("slug must not be empty".to_string()));
    }
    if slug.len() > SLUG_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "slug must be at most {SLUG_MAX_CHARS} characters"
        )));
    }

    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if !well_formed {
        return Err(DomainError::Validation(format!(
            "slug `{slug}` must be lowercase letters, digits and single hyphens"
        )));
    }

    Ok(())
}

// Slugs produced by `slug::slugify` are ASCII, so byte slicing is safe here.
fn clamp(slug: &str, max: usize) -> &str {
    let cut = if slug.len() > max { &slug[..max] } else { slug };
    cut.trim_end_matches('-')
}
