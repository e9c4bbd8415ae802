//! Content normalization for zone record comparison
//!
//! The API returns names in whatever case and root-dot form they were
//! written with, and TXT content sometimes quoted and sometimes not. Two
//! pure functions decide when an observed entry is the declared one.

/// Canonical form of a DNS name: lower-cased, one trailing `.` removed
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    match lowered.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Whether two record contents are the same value for the given type
///
/// TXT content is case-meaningful text: one layer of surrounding double
/// quotes is ignored on each side, the rest compares exactly. Every other
/// type compares case-insensitively.
pub fn content_equals(record_type: &str, a: &str, b: &str) -> bool {
    if is_txt(record_type) {
        unquote(a) == unquote(b)
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Whether the type names the TXT record type
pub fn is_txt(record_type: &str) -> bool {
    record_type.eq_ignore_ascii_case("TXT")
}

fn unquote(content: &str) -> &str {
    content
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(content)
}
