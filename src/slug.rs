//! Slug normalization for document URLs.

use unicode_normalization::UnicodeNormalization;

/// Normalize arbitrary text into a lowercase, hyphen-separated ASCII slug.
///
/// Accented characters are decomposed and folded to their base letter, every
/// other run of non-alphanumeric characters becomes a single hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.nfkd() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii() || ch.is_whitespace() {
            pending_hyphen = true;
        }
        // Combining marks and other non-ASCII code points are dropped.
    }

    slug
}

/// Use the model-provided slug when it survives normalization, otherwise derive
/// one from the title.
pub fn normalize_or_derive(slug: &str, title: &str) -> String {
    let normalized = slugify(slug);
    if normalized.is_empty() {
        slugify(title)
    } else {
        normalized
    }
}
