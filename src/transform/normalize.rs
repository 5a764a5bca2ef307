//! Field normalization rules applied while building dimensions.

use chrono::{NaiveDate, NaiveDateTime};

const GENRE_PUNCTUATION: &[char] = &['[', ']', '\'', '"'];

/// Trims, lower-cases and then capitalizes the first letter of every word.
///
/// A word starts after any character that is not alphanumeric and not an apostrophe,
/// so `"AC/DC"` becomes `"Ac/Dc"` and `"don't stop"` becomes `"Don't Stop"`.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut normalized = String::with_capacity(lowered.len());
    let mut at_word_start = true;
    for c in lowered.chars() {
        if at_word_start && c.is_alphanumeric() {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => normalized.push(u),
                // Multi-char uppercase forms (e.g. 'ß') would not lower back to the input.
                _ => normalized.push(c),
            }
        } else {
            normalized.push(c);
        }
        at_word_start = !c.is_alphanumeric() && !is_apostrophe(c);
    }
    normalized
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

/// Strips list punctuation from a genre field; blank and `N/A` values are absent.
pub fn normalize_genres(genres: Option<&str>) -> Option<String> {
    let cleaned: String = genres?.chars().filter(|c| !GENRE_PUNCTUATION.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Trimmed text, or `None` when only whitespace is left.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a release date in one of the common export formats.
///
/// Month precision (`2001-03`) resolves to the first of the month. A bare year is
/// rejected, as is anything else that does not name a single calendar day.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok())
}
