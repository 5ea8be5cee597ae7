use crate::url::extract_domain;
use url::Url;

/// Longest slug produced, before any timestamp or counter suffix
const MAX_SLUG_LEN: usize = 80;

/// Slug used when nothing usable remains after sanitizing
const FALLBACK_SLUG: &str = "export";

/// Builds a filesystem-safe base name from a URL's host and path
///
/// Runs of characters other than ASCII letters and digits collapse to a
/// single `-`, and the result is lowercased.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_explorer::url::slug_from_url;
///
/// let url = Url::parse("https://www.example.com/Changelog/").unwrap();
/// assert_eq!(slug_from_url(&url), "example-com-changelog");
/// ```
pub fn slug_from_url(url: &Url) -> String {
    let host = extract_domain(url).unwrap_or_default();
    slugify(&format!("{}{}", host, url.path()))
}

/// Sanitizes a caller-chosen file stem
///
/// Keeps letters, digits, `-`, `_` and `.`, replaces everything else with
/// `-`, and strips leading dots so the result is never a hidden file.
pub fn sanitize_file_stem(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').trim_matches('-');
    if cleaned.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        truncate(cleaned).to_string()
    }
}

fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    truncate(&slug).trim_end_matches('-').to_string()
}

fn truncate(s: &str) -> &str {
    // ASCII-only input after sanitizing, so byte slicing is safe
    if s.len() > MAX_SLUG_LEN {
        &s[..MAX_SLUG_LEN]
    } else {
        s
    }
}
