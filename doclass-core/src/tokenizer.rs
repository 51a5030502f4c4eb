//! Lexical normalization shared by every token family.
//!
//! Text is split on runs of anything that is not an ASCII letter; surviving
//! fragments are lowercased. Digits and punctuation never produce tokens, so
//! "2023" in a filename contributes nothing here (the year flag covers it).

use once_cell::sync::Lazy;
use regex::Regex;

/// Dropped from filename and document-URL families.
pub const NOISE_TOKEN: &str = "pdf";

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z]+").unwrap());

pub fn tokenize(text: &str) -> Vec<String> {
    NON_ALPHA
        .split(text)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| fragment.to_ascii_lowercase())
        .collect()
}

/// `tokenize` without the noise term.
pub fn tokenize_without_noise(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| token != NOISE_TOKEN)
        .collect()
}

/// Path component of a URL.
///
/// Drops `scheme:` and `//netloc`, stops at `?` or `#`, and strips `;params`
/// from the final segment. Relative references return their path portion.
/// No percent-decoding or normalization is applied.
pub fn url_path(url: &str) -> &str {
    let mut rest = url;

    if let Some(colon) = rest.find(':') {
        let scheme = &rest[..colon];
        let is_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if is_scheme {
            rest = &rest[colon + 1..];
        }
    }

    if let Some(after) = rest.strip_prefix("//") {
        let netloc_end = after
            .find(|c: char| matches!(c, '/' | '?' | '#'))
            .unwrap_or(after.len());
        rest = &after[netloc_end..];
    }

    let path_end = rest
        .find(|c: char| matches!(c, '?' | '#'))
        .unwrap_or(rest.len());
    let path = &rest[..path_end];

    let last_segment = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[last_segment..].find(';') {
        Some(params) => &path[..last_segment + params],
        None => path,
    }
}
