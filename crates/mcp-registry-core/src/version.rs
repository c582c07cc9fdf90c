//! Dotted version ordering.
//!
//! Versions are compared numerically segment by segment. This is a total
//! order but not semantic versioning: there is no notion of pre-release or
//! build metadata. The segment `0-rc1` is not a number and counts as zero, so
//! `1.0.0-rc1` compares equal to `1.0.0`. Known simplification.

use std::cmp::Ordering;

/// Normalize one dot-separated segment to its significant digits.
///
/// Anything non-numeric counts as zero, which is the empty string here.
/// Segments are never converted to a fixed-width integer, so arbitrarily
/// long numbers still order correctly.
fn parse_segment(segment: &str) -> &str {
    let digits = segment.trim();
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return "";
    }
    digits.trim_start_matches('0')
}

/// Order two normalized segments: more significant digits wins, then digits.
fn compare_segments(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare two dotted version strings.
///
/// The shorter segment list is right-padded with zeros, so `1.2` equals
/// `1.2.0`. Never fails.
///
/// - `compare_versions("1.9", "1.10")` is `Less`
/// - `compare_versions("1.x", "1.0")` is `Equal`
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').map(parse_segment).collect();
    let right: Vec<&str> = b.split('.').map(parse_segment).collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or("");
        let r = right.get(i).copied().unwrap_or("");
        match compare_segments(l, r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// The greatest version in `versions`, or `None` when empty.
///
/// Ties keep the first occurrence.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().fold(None, |best, candidate| match best {
        Some(current) if compare_versions(candidate, current) != Ordering::Greater => {
            Some(current)
        }
        _ => Some(candidate),
    })
}
