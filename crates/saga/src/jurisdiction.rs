//! Tax jurisdiction derived from a pickup location.

const PROVINCES: &[(&str, &str)] = &[
    ("AB", "alberta"),
    ("BC", "british columbia"),
    ("MB", "manitoba"),
    ("NB", "new brunswick"),
    ("NL", "newfoundland and labrador"),
    ("NS", "nova scotia"),
    ("NT", "northwest territories"),
    ("NU", "nunavut"),
    ("ON", "ontario"),
    ("PE", "prince edward island"),
    ("QC", "quebec"),
    ("SK", "saskatchewan"),
    ("YT", "yukon"),
];

/// Returns the province or territory code found in a free-text location, or
/// an empty string when none is recognized.
///
/// Comma-separated segments are searched from the end, since addresses end
/// with the province. Within a segment a full name wins over a code. A code
/// counts when written in capitals or when it is the whole segment, so the
/// word "on" in a street line is not Ontario.
pub fn tax_province(location: &str) -> &'static str {
    location
        .rsplit(',')
        .find_map(segment_province)
        .unwrap_or("")
}

fn segment_province(segment: &str) -> Option<&'static str> {
    let lowered = segment.to_lowercase().replace('é', "e");
    if let Some((code, _)) = PROVINCES.iter().find(|(_, name)| lowered.contains(name)) {
        return Some(*code);
    }

    let whole = segment.trim();
    segment
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .rev()
        .filter(|token| *token == whole || token.chars().all(|c| c.is_ascii_uppercase()))
        .find_map(|token| {
            PROVINCES
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(token))
                .map(|(code, _)| *code)
        })
}
